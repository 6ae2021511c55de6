//! Core types for Clipcast

use std::path::Path;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// One queued clip with its caption text and posting status
///
/// This is the typed view of a queue entry. The raw JSON object it was read
/// from is kept by [`crate::store::Queue`] so unknown fields survive a save.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub id: String,
    /// Clip file name, relative to the media directory
    pub filename: String,
    /// Who says the quote
    pub character: String,
    pub quote: String,
    /// Longer description, used as accessibility text
    #[serde(default)]
    pub description: Option<String>,
    pub posted: bool,
    #[serde(default)]
    pub post_date: Option<DateTime<Utc>>,
}

impl Item {
    /// Caption posted alongside the clip
    pub fn caption(&self) -> String {
        compose_caption(&self.quote, &self.character)
    }

    /// Alt text for the embedded video; empty when there is no description
    pub fn alt_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Quote in double quotes, a blank line, then an em-dash and the speaker
pub fn compose_caption(quote: &str, character: &str) -> String {
    format!("\"{}\"\n\n— {}", quote, character)
}

/// Video MIME types accepted for upload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VideoMimeType {
    Mp4,
    QuickTime,
    WebM,
    Mpeg,
}

impl VideoMimeType {
    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp4" | "m4v" => Some(Self::Mp4),
            "mov" | "qt" => Some(Self::QuickTime),
            "webm" => Some(Self::WebM),
            "mpeg" | "mpg" => Some(Self::Mpeg),
            _ => None,
        }
    }

    /// MIME type for a clip path, `video/mp4` when the extension is unknown
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::Mp4)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::QuickTime => "video/quicktime",
            Self::WebM => "video/webm",
            Self::Mpeg => "video/mpeg",
        }
    }
}

impl std::fmt::Display for VideoMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authenticated session with the remote service
#[derive(Debug)]
pub struct Session {
    /// Account DID, used as the repo for new records
    pub did: String,
    pub handle: String,
    access_token: SecretString,
}

impl Session {
    pub fn new(did: impl Into<String>, handle: impl Into<String>, access_token: String) -> Self {
        Self {
            did: did.into(),
            handle: handle.into(),
            access_token: SecretString::from(access_token),
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

/// Opaque reference to an uploaded blob, passed back verbatim in the post embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(serde_json::Value);

impl BlobRef {
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Media attached to a post
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEmbed {
    pub media: BlobRef,
    pub alt_text: String,
}

/// A post ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub text: String,
    pub embed: MediaEmbed,
    pub created_at: DateTime<Utc>,
}

/// Reference to a created post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}
