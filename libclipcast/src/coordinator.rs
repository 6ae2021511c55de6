//! One posting run: load, select, publish, persist
//!
//! The coordinator owns the only write to the queue record and performs it
//! at most once, after a publish has fully succeeded. Every failure is
//! terminal for the run and is logged here with the step and item it
//! happened on.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{MediaSettings, RunConfig};
use crate::error::{ClipcastError, QueueError, Result};
use crate::platforms::SocialClient;
use crate::publisher::{resolve_media, Publisher, ResolvedMedia};
use crate::selector::select_next;
use crate::store::{JsonFileStore, Queue, QueueStorage};
use crate::types::{Item, PostRef};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Loading,
    Selecting,
    Publishing,
    Persisting,
    Done,
    Errored,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Loading => "loading",
            RunState::Selecting => "selecting",
            RunState::Publishing => "publishing",
            RunState::Persisting => "persisting",
            RunState::Done => "done",
            RunState::Errored => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Errored)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every item is already posted
    NothingToPost,
    Posted {
        item_id: String,
        post: PostRef,
        posted_at: DateTime<Utc>,
    },
}

/// What a run would do, computed without credentials or network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    NothingToPost,
    Ready {
        item: Item,
        media: ResolvedMedia,
        caption: String,
    },
}

/// Load the queue, pick the next item, and check its clip exists.
///
/// Never authenticates, uploads, or writes.
pub async fn preview(store: &dyn QueueStorage, media: &MediaSettings) -> Result<Preview> {
    let queue = store.load()?;

    let Some(item) = select_next(&queue) else {
        return Ok(Preview::NothingToPost);
    };

    let resolved = resolve_media(media, item).await?;
    Ok(Preview::Ready {
        caption: item.caption(),
        item: item.clone(),
        media: resolved,
    })
}

/// Drives a single posting run
pub struct RunCoordinator {
    store: Box<dyn QueueStorage>,
    publisher: Publisher,
    state: RunState,
    current_item: Option<String>,
}

impl RunCoordinator {
    /// Create a coordinator that reads and writes the JSON record at
    /// `config.queue_path`
    pub fn new(config: RunConfig, client: Box<dyn SocialClient>) -> Self {
        Self {
            store: Box::new(JsonFileStore::new(config.queue_path)),
            publisher: Publisher::new(client, config.credentials, config.media),
            state: RunState::Idle,
            current_item: None,
        }
    }

    /// Swap the queue storage backend
    pub fn with_store(mut self, store: Box<dyn QueueStorage>) -> Self {
        self.store = store;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Id of the item selected for this run, if selection has happened
    pub fn current_item(&self) -> Option<&str> {
        self.current_item.as_deref()
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }

    fn fail(&mut self, step: RunState, error: ClipcastError) -> ClipcastError {
        if matches!(error, ClipcastError::PersistAfterPublish { .. }) {
            tracing::error!(
                step = %step,
                item_id = self.current_item.as_deref().unwrap_or("-"),
                kind = error.kind(),
                error = %error,
                "Post published but queue record not updated; the item will be posted again on the next run"
            );
        } else {
            tracing::error!(
                step = %step,
                item_id = self.current_item.as_deref().unwrap_or("-"),
                kind = error.kind(),
                error = %error,
                "Run failed"
            );
        }
        self.transition(RunState::Errored);
        error
    }

    /// Mark the published item and save the record.
    ///
    /// The remote post already exists at this point, so every failure is
    /// reported as `PersistAfterPublish`.
    fn persist(
        &self,
        queue: &mut Queue,
        item_id: &str,
        post: &PostRef,
        posted_at: DateTime<Utc>,
    ) -> Result<()> {
        let marked = queue
            .mark_posted(item_id, posted_at)
            .map(|_| ())
            .map_err(|e| QueueError::UpdateFailed {
                id: item_id.to_string(),
                reason: e.to_string(),
            });

        marked
            .and_then(|()| self.store.save(queue))
            .map_err(|source| ClipcastError::PersistAfterPublish {
                item_id: item_id.to_string(),
                post_uri: post.uri.clone(),
                source,
            })
    }

    /// Execute the run. A coordinator runs exactly once.
    ///
    /// # Errors
    ///
    /// - Queue errors if the record cannot be loaded
    /// - Publish errors from any step of the publish protocol; the record is
    ///   left untouched
    /// - `ClipcastError::PersistAfterPublish` if the post went out but the
    ///   record could not be saved
    pub async fn run_once(&mut self) -> Result<RunOutcome> {
        if self.state != RunState::Idle {
            return Err(ClipcastError::InvalidInput(format!(
                "Run already {}; create a new coordinator for another run",
                self.state
            )));
        }

        let started_at = Utc::now();
        tracing::debug!(
            store = %self.store.location(),
            client = self.publisher.client_name(),
            "Starting run"
        );

        self.transition(RunState::Loading);
        let mut queue = match self.store.load() {
            Ok(queue) => queue,
            Err(e) => return Err(self.fail(RunState::Loading, e.into())),
        };

        self.transition(RunState::Selecting);
        let item = match select_next(&queue) {
            Some(item) => item.clone(),
            None => {
                tracing::info!(items = queue.len(), "Nothing to post; every item is posted");
                self.transition(RunState::Done);
                return Ok(RunOutcome::NothingToPost);
            }
        };
        self.current_item = Some(item.id.clone());

        self.transition(RunState::Publishing);
        let post = match self.publisher.publish(&item).await {
            Ok(post) => post,
            Err(e) => return Err(self.fail(RunState::Publishing, e.into())),
        };

        self.transition(RunState::Persisting);
        let posted_at = Utc::now().max(started_at);
        if let Err(e) = self.persist(&mut queue, &item.id, &post, posted_at) {
            return Err(self.fail(RunState::Persisting, e));
        }

        tracing::info!(item_id = %item.id, uri = %post.uri, "Posted");
        self.transition(RunState::Done);
        Ok(RunOutcome::Posted {
            item_id: item.id,
            post,
            posted_at,
        })
    }
}
