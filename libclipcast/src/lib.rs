//! Clipcast - post a queue of video clips to Bluesky, one per run
//!
//! This library holds the queue record, picks the next unposted clip,
//! publishes it, and records the result so each clip goes out once.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod publisher;
pub mod selector;
mod splice;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{Config, Credentials, MediaSettings, RunConfig};
pub use coordinator::{preview, Preview, RunCoordinator, RunOutcome, RunState};
pub use error::{ClipcastError, PlatformError, PublishError, QueueError, Result};
pub use store::{JsonFileStore, Queue, QueueStats, QueueStorage};
pub use types::{Item, PostRef};
