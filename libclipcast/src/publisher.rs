//! Publishing one queue item
//!
//! The protocol is a strict sequence: authenticate, resolve the local clip,
//! upload it, then create the post. Each step maps its failure to its own
//! [`PublishError`] variant and nothing is retried. A failure after the
//! upload leaves the blob orphaned on the remote; that is accepted.

use std::path::PathBuf;

use chrono::Utc;

use crate::config::{Credentials, MediaSettings};
use crate::error::{PlatformError, PublishError};
use crate::platforms::SocialClient;
use crate::types::{Item, MediaEmbed, PostDraft, PostRef, VideoMimeType};

/// A clip on disk that is ready to be read and uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: VideoMimeType,
}

/// Locate an item's clip under the media directory.
///
/// Anything that is not a regular file counts as missing.
pub async fn resolve_media(
    media: &MediaSettings,
    item: &Item,
) -> Result<ResolvedMedia, PublishError> {
    let path = media.dir.join(&item.filename);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(PublishError::MediaNotFound { path }),
    };

    Ok(ResolvedMedia {
        mime_type: VideoMimeType::from_path(&path),
        size: metadata.len(),
        path,
    })
}

/// Reject clips the network would refuse, before spending an upload on them
fn check_upload_size(resolved: &ResolvedMedia, limit: u64) -> Result<(), PublishError> {
    if resolved.size == 0 {
        return Err(PublishError::Upload(PlatformError::Validation(format!(
            "{} is empty",
            resolved.path.display()
        ))));
    }

    if resolved.size > limit {
        return Err(PublishError::Upload(PlatformError::Validation(format!(
            "{} is {} bytes, over the {} byte upload limit",
            resolved.path.display(),
            resolved.size,
            limit
        ))));
    }

    Ok(())
}

/// Reject captions over the client's limit before anything is uploaded.
///
/// Length is counted in Unicode scalar values. Bluesky counts graphemes, so
/// this is conservative: a caption heavy in combining marks or joined emoji
/// can be refused here even though the service would take it.
fn check_caption(caption: &str, limit: Option<usize>) -> Result<(), PublishError> {
    let Some(limit) = limit else {
        return Ok(());
    };

    let length = caption.chars().count();
    if length > limit {
        return Err(PublishError::Submit(PlatformError::Validation(format!(
            "Caption exceeds {} character limit (got {} characters)",
            limit, length
        ))));
    }

    Ok(())
}

/// Runs the publish protocol against a [`SocialClient`]
pub struct Publisher {
    client: Box<dyn SocialClient>,
    credentials: Credentials,
    media: MediaSettings,
}

impl Publisher {
    pub fn new(client: Box<dyn SocialClient>, credentials: Credentials, media: MediaSettings) -> Self {
        Self {
            client,
            credentials,
            media,
        }
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Publish a single item and return the remote post reference.
    ///
    /// # Errors
    ///
    /// - `PublishError::Auth` if the credentials are rejected
    /// - `PublishError::MediaNotFound` if the clip is missing; no upload or
    ///   post is attempted
    /// - `PublishError::Upload` if the clip is empty, too large, unreadable,
    ///   or the remote rejects it
    /// - `PublishError::Submit` if the caption is too long or post creation
    ///   fails
    pub async fn publish(&self, item: &Item) -> Result<PostRef, PublishError> {
        tracing::debug!(item_id = %item.id, client = self.client.name(), "Authenticating");
        let session = self
            .client
            .authenticate(&self.credentials.identifier, &self.credentials.secret)
            .await
            .map_err(PublishError::Auth)?;

        let resolved = resolve_media(&self.media, item).await?;
        check_upload_size(&resolved, self.media.max_upload_bytes)?;

        let caption = item.caption();
        check_caption(&caption, self.client.character_limit())?;

        let bytes = tokio::fs::read(&resolved.path).await.map_err(|e| {
            PublishError::Upload(PlatformError::Validation(format!(
                "Failed to read {}: {}",
                resolved.path.display(),
                e
            )))
        })?;

        tracing::debug!(
            item_id = %item.id,
            bytes = bytes.len(),
            mime_type = %resolved.mime_type,
            "Uploading media"
        );
        let blob = self
            .client
            .upload_blob(&session, bytes, resolved.mime_type.as_str())
            .await
            .map_err(PublishError::Upload)?;

        let draft = PostDraft {
            text: caption,
            embed: MediaEmbed {
                media: blob,
                alt_text: item.alt_text().to_string(),
            },
            created_at: Utc::now(),
        };

        tracing::debug!(item_id = %item.id, "Creating post");
        self.client
            .create_post(&session, &draft)
            .await
            .map_err(PublishError::Submit)
    }
}
