//! Error types for Clipcast

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClipcastError>;

#[derive(Error, Debug)]
pub enum ClipcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// The remote post exists but the queue record still shows the item as
    /// unposted. The next run will post the same item again.
    #[error(
        "Item '{item_id}' was posted as {post_uri} but the queue record could not be updated: {source}. \
         Mark it as posted by hand before the next run to avoid a duplicate post"
    )]
    PersistAfterPublish {
        item_id: String,
        post_uri: String,
        #[source]
        source: QueueError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClipcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ClipcastError::InvalidInput(_) => 3,
            ClipcastError::Queue(QueueError::Corrupt { .. }) => 3,
            ClipcastError::Publish(PublishError::MediaNotFound { .. }) => 3,
            ClipcastError::Publish(PublishError::Auth(_)) => 2,
            ClipcastError::PersistAfterPublish { .. } => 4,
            ClipcastError::Publish(_) => 1,
            ClipcastError::Queue(_) => 1,
            ClipcastError::Config(_) => 1,
        }
    }

    /// Stable lowercase label for logs and machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            ClipcastError::Config(_) => "config",
            ClipcastError::Queue(e) => e.kind(),
            ClipcastError::Publish(e) => e.kind(),
            ClipcastError::PersistAfterPublish { .. } => "persist_after_publish",
            ClipcastError::InvalidInput(_) => "invalid_input",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Failures of the queue record on disk
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue record not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Queue record {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to read queue record {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write queue record {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to update item '{id}': {reason}")]
    UpdateFailed { id: String, reason: String },
}

impl QueueError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::NotFound { .. } => "not_found",
            QueueError::Corrupt { .. } => "corrupt",
            QueueError::ReadFailed { .. } => "read_failed",
            QueueError::WriteFailed { .. } => "write_failed",
            QueueError::UpdateFailed { .. } => "update_failed",
        }
    }
}

/// Failures of the publish protocol, one variant per step
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    Auth(#[source] PlatformError),

    #[error("Media file not found: {}", path.display())]
    MediaNotFound { path: PathBuf },

    #[error("Media upload failed: {0}")]
    Upload(#[source] PlatformError),

    #[error("Post submission failed: {0}")]
    Submit(#[source] PlatformError),
}

impl PublishError {
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Auth(_) => "auth_error",
            PublishError::MediaNotFound { .. } => "media_not_found",
            PublishError::Upload(_) => "upload_error",
            PublishError::Submit(_) => "submit_error",
        }
    }
}

/// Errors reported by a remote social client
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}
