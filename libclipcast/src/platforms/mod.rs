//! Remote social network clients
//!
//! The publisher only needs three capabilities from a network: log in,
//! upload a blob, and create a post that embeds that blob. [`SocialClient`]
//! captures exactly that, so the posting flow can run against Bluesky in
//! production and against [`mock::MockClient`] in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libclipcast::config::BlueskyConfig;
//! use libclipcast::platforms::{bluesky::BlueskyClient, SocialClient};
//! use secrecy::SecretString;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BlueskyClient::from_config(&BlueskyConfig::default())?;
//! let secret = SecretString::from("app-password".to_string());
//! let session = client.authenticate("bananastand.bsky.social", &secret).await?;
//! let blob = client
//!     .upload_blob(&session, std::fs::read("clip.mp4")?, "video/mp4")
//!     .await?;
//! println!("uploaded {:?}", blob);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::PlatformError;
use crate::types::{BlobRef, PostDraft, PostRef, Session};

pub mod bluesky;

// Mock client is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Capabilities the publisher consumes from a remote social network
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Exchange credentials for a session
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the remote rejects the
    /// credentials, or a network error if the service is unreachable.
    async fn authenticate(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Session, PlatformError>;

    /// Upload binary content and return the remote's reference to it
    async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<BlobRef, PlatformError>;

    /// Create a post with the uploaded media attached
    async fn create_post(&self, session: &Session, draft: &PostDraft)
        -> Result<PostRef, PlatformError>;

    /// Lowercase client identifier (e.g., "bluesky")
    fn name(&self) -> &str;

    /// Maximum post text length in characters, if the network has one
    fn character_limit(&self) -> Option<usize>;
}
