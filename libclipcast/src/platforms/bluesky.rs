//! Bluesky platform implementation
//!
//! Talks to a PDS over plain XRPC: `createSession` to log in, `uploadBlob`
//! for the clip, and `createRecord` for an `app.bsky.feed.post` carrying an
//! `app.bsky.embed.video` embed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::BlueskyConfig;
use crate::error::{ConfigError, PlatformError, Result};
use crate::platforms::SocialClient;
use crate::types::{BlobRef, PostDraft, PostRef, Session};

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const UPLOAD_BLOB: &str = "com.atproto.repo.uploadBlob";
const CREATE_RECORD: &str = "com.atproto.repo.createRecord";
const POST_COLLECTION: &str = "app.bsky.feed.post";
const VIDEO_EMBED: &str = "app.bsky.embed.video";

/// Bluesky post text limit
const CHARACTER_LIMIT: usize = 300;

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    did: String,
    handle: String,
}

#[derive(Deserialize)]
struct UploadBlobResponse {
    blob: Value,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: Value,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
    cid: String,
}

/// Error body returned by XRPC endpoints
#[derive(Deserialize, Default)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a non-success XRPC response to PlatformError
///
/// Classifies on the HTTP status and the AT Protocol error name (e.g.
/// "AuthenticationRequired", "RateLimitExceeded"), keeping both in the
/// message so operators can look them up.
///
/// # Arguments
///
/// * `status` - HTTP status of the response
/// * `body` - Raw response body
/// * `context` - The operation context (e.g., "authentication", "upload")
fn map_xrpc_error(status: StatusCode, body: &str, context: &str) -> PlatformError {
    let parsed: XrpcErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error.unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| body.trim().chars().take(200).collect());
    let detail = if code.is_empty() {
        format!("{} {}", status.as_u16(), message)
    } else {
        format!("{} {}: {}", status.as_u16(), code, message)
    };

    match (status.as_u16(), code.as_str()) {
        (401 | 403, _)
        | (_, "AuthenticationRequired" | "InvalidToken" | "ExpiredToken" | "AccountTakedown") => {
            PlatformError::Authentication(format!(
                "Bluesky rejected credentials during {}: {}. Check the handle and app password.",
                context, detail
            ))
        }
        (429, _) | (_, "RateLimitExceeded") => PlatformError::RateLimit(format!(
            "Bluesky rate limit exceeded during {}: {}",
            context, detail
        )),
        (413, _) | (_, "BlobTooLarge") => PlatformError::Validation(format!(
            "Bluesky refused the media as too large during {}: {}",
            context, detail
        )),
        (400, _) | (_, "InvalidRequest" | "InvalidRecord" | "InvalidMimeType") => {
            PlatformError::Validation(format!(
                "Bluesky rejected the request during {}: {}",
                context, detail
            ))
        }
        (500..=599, _) => PlatformError::Network(format!(
            "Bluesky PDS error during {}: {}",
            context, detail
        )),
        _ => PlatformError::Posting(format!(
            "Bluesky operation failed during {}: {}",
            context, detail
        )),
    }
}

/// Map a failure to reach the PDS at all
fn map_transport_error(error: &reqwest::Error, context: &str) -> PlatformError {
    if error.is_timeout() {
        PlatformError::Network(format!(
            "Timed out talking to Bluesky PDS during {}: {}",
            context, error
        ))
    } else {
        PlatformError::Network(format!(
            "Network error while connecting to Bluesky PDS during {}: {}",
            context, error
        ))
    }
}

/// Build the `app.bsky.feed.post` record for a draft
fn post_record(draft: &PostDraft) -> Value {
    json!({
        "$type": POST_COLLECTION,
        "text": draft.text,
        "createdAt": draft.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "embed": {
            "$type": VIDEO_EMBED,
            "video": draft.embed.media.as_json(),
            "alt": draft.embed.alt_text,
        },
    })
}

pub struct BlueskyClient {
    http: reqwest::Client,
    service: String,
}

impl BlueskyClient {
    /// Create a new Bluesky client
    ///
    /// # Arguments
    ///
    /// * `service` - PDS base URL (e.g., "https://bsky.social")
    /// * `timeout` - Per-request timeout
    pub fn new(service: &str, timeout: Duration) -> Result<Self> {
        let service = service.trim().trim_end_matches('/');
        if !(service.starts_with("https://") || service.starts_with("http://")) {
            return Err(ConfigError::InvalidValue(format!(
                "bluesky.service must be an http(s) URL, got '{}'",
                service
            ))
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clipcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            service: service.to_string(),
        })
    }

    pub fn from_config(config: &BlueskyConfig) -> Result<Self> {
        Self::new(&config.service, Duration::from_secs(config.timeout_secs))
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn xrpc_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.service, nsid)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> std::result::Result<T, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(&e, context))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_xrpc_error(status, &body, context));
        }

        response.json::<T>().await.map_err(|e| {
            PlatformError::Posting(format!(
                "Unexpected Bluesky response during {}: {}",
                context, e
            ))
        })
    }
}

#[async_trait]
impl SocialClient for BlueskyClient {
    async fn authenticate(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> std::result::Result<Session, PlatformError> {
        tracing::debug!("Creating Bluesky session for {}", identifier);

        let request = self.http.post(self.xrpc_url(CREATE_SESSION)).json(&CreateSessionRequest {
            identifier,
            password: secret.expose_secret(),
        });
        let response: CreateSessionResponse = self.send(request, "authentication").await?;

        tracing::debug!(did = %response.did, "Bluesky session created");
        Ok(Session::new(response.did, response.handle, response.access_jwt))
    }

    async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> std::result::Result<BlobRef, PlatformError> {
        tracing::debug!("Uploading {} bytes ({}) to Bluesky", bytes.len(), mime_type);

        let request = self
            .http
            .post(self.xrpc_url(UPLOAD_BLOB))
            .bearer_auth(session.access_token())
            .header(CONTENT_TYPE, mime_type)
            .body(bytes);
        let response: UploadBlobResponse = self.send(request, "upload").await?;

        Ok(BlobRef::new(response.blob))
    }

    async fn create_post(
        &self,
        session: &Session,
        draft: &PostDraft,
    ) -> std::result::Result<PostRef, PlatformError> {
        tracing::debug!("Posting to Bluesky: {} characters", draft.text.chars().count());

        let request = self
            .http
            .post(self.xrpc_url(CREATE_RECORD))
            .bearer_auth(session.access_token())
            .json(&CreateRecordRequest {
                repo: &session.did,
                collection: POST_COLLECTION,
                record: post_record(draft),
            });
        let response: CreateRecordResponse = self.send(request, "posting").await?;

        tracing::debug!("Posted to Bluesky: {}", response.uri);
        Ok(PostRef {
            uri: response.uri,
            cid: response.cid,
        })
    }

    fn name(&self) -> &str {
        "bluesky"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }
}
