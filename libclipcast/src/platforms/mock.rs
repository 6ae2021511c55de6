//! Mock social client for testing
//!
//! Simulates a remote network without credentials or network access. Each
//! step (authenticate, upload, post) can be told to fail, and every call is
//! recorded so tests can assert exactly which remote effects happened.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::time::sleep;

use crate::error::PlatformError;
use crate::platforms::SocialClient;
use crate::types::{BlobRef, PostDraft, PostRef, Session};

/// A blob handed to [`MockClient::upload_blob`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub size: usize,
    pub mime_type: String,
}

/// Configuration for mock client behavior
///
/// Clones share the same call counters, so a test can keep one copy after
/// moving the client into a coordinator.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Client name reported by `name()`
    pub name: String,

    /// Error to return from authenticate, if any
    pub auth_error: Option<PlatformError>,

    /// Error to return from upload_blob, if any
    pub upload_error: Option<PlatformError>,

    /// Error to return from create_post, if any
    pub post_error: Option<PlatformError>,

    /// Accepted app password; any password is accepted when `None`
    pub expected_secret: Option<String>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Character limit reported to the publisher
    pub character_limit: Option<usize>,

    pub auth_call_count: Arc<Mutex<usize>>,
    pub upload_call_count: Arc<Mutex<usize>>,
    pub post_call_count: Arc<Mutex<usize>>,

    /// Uploads that have been made (for verification)
    pub uploads: Arc<Mutex<Vec<RecordedUpload>>>,

    /// Drafts that have been posted (for verification)
    pub posted_drafts: Arc<Mutex<Vec<PostDraft>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_error: None,
            upload_error: None,
            post_error: None,
            expected_secret: None,
            delay: Duration::from_millis(0),
            character_limit: Some(300),
            auth_call_count: Arc::new(Mutex::new(0)),
            upload_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            uploads: Arc::new(Mutex::new(Vec::new())),
            posted_drafts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockConfig {
    pub fn auth_call_count(&self) -> usize {
        *self.auth_call_count.lock().unwrap()
    }

    pub fn upload_call_count(&self) -> usize {
        *self.upload_call_count.lock().unwrap()
    }

    pub fn post_call_count(&self) -> usize {
        *self.post_call_count.lock().unwrap()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn posted_drafts(&self) -> Vec<PostDraft> {
        self.posted_drafts.lock().unwrap().clone()
    }

    /// True if no remote call of any kind was made
    pub fn untouched(&self) -> bool {
        self.auth_call_count() == 0 && self.upload_call_count() == 0 && self.post_call_count() == 0
    }
}

/// Mock client for testing
pub struct MockClient {
    config: MockConfig,
}

impl MockClient {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock client that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock client that rejects credentials
    pub fn auth_failure(error: &str) -> Self {
        Self::new(MockConfig {
            auth_error: Some(PlatformError::Authentication(error.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock client whose uploads fail
    pub fn upload_failure(error: &str) -> Self {
        Self::new(MockConfig {
            upload_error: Some(PlatformError::Network(error.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock client whose post creation fails
    pub fn post_failure(error: &str) -> Self {
        Self::new(MockConfig {
            post_error: Some(PlatformError::Posting(error.to_string())),
            ..Default::default()
        })
    }

    /// Shared handle on the call counters and recordings
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl SocialClient for MockClient {
    async fn authenticate(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<Session, PlatformError> {
        *self.config.auth_call_count.lock().unwrap() += 1;
        self.simulate_latency().await;

        if let Some(error) = &self.config.auth_error {
            return Err(error.clone());
        }

        if let Some(expected) = &self.config.expected_secret {
            if secret.expose_secret() != expected {
                return Err(PlatformError::Authentication(
                    "Invalid identifier or password".to_string(),
                ));
            }
        }

        Ok(Session::new(
            format!("did:mock:{}", identifier),
            identifier,
            format!("mock-token-{}", uuid::Uuid::new_v4()),
        ))
    }

    async fn upload_blob(
        &self,
        _session: &Session,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<BlobRef, PlatformError> {
        *self.config.upload_call_count.lock().unwrap() += 1;
        self.simulate_latency().await;

        if let Some(error) = &self.config.upload_error {
            return Err(error.clone());
        }

        self.config.uploads.lock().unwrap().push(RecordedUpload {
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        });

        Ok(BlobRef::new(json!({
            "$type": "blob",
            "ref": {"$link": format!("mock-blob-{}", uuid::Uuid::new_v4())},
            "mimeType": mime_type,
            "size": bytes.len(),
        })))
    }

    async fn create_post(
        &self,
        session: &Session,
        draft: &PostDraft,
    ) -> Result<PostRef, PlatformError> {
        *self.config.post_call_count.lock().unwrap() += 1;
        self.simulate_latency().await;

        if let Some(error) = &self.config.post_error {
            return Err(error.clone());
        }

        self.config.posted_drafts.lock().unwrap().push(draft.clone());

        let rkey = uuid::Uuid::new_v4().simple().to_string();
        Ok(PostRef {
            uri: format!("at://{}/app.bsky.feed.post/{}", session.did, rkey),
            cid: format!("mock-cid-{}", rkey),
        })
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }
}
