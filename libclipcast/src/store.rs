//! Queue record persistence
//!
//! The queue lives in a JSON document that people edit by hand, so the
//! in-memory [`Queue`] keeps the record's text next to the typed [`Item`]
//! views. Updates splice new values for `posted` / `post_date` into that text
//! and saving writes it back, so every other byte of the record survives.
//!
//! Two layouts are accepted: a root array of items, or a root object whose
//! `items` key holds the array (other root keys are carried along).

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{ClipcastError, QueueError, Result};
use crate::splice::{self, EntrySpans, Replacement};
use crate::types::Item;

/// Ordered queue of clips plus the text it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Queue {
    raw: String,
    items: Vec<Item>,
}

/// Counts over a queue, for reporting
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub posted: usize,
    pub remaining: usize,
    pub next_id: Option<String>,
    pub last_posted_id: Option<String>,
    pub last_posted_at: Option<DateTime<Utc>>,
}

impl Queue {
    /// Parse a queue document, returning the reason it is unusable on failure
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let document: Value =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))?;

        let entries = item_array(&document).ok_or_else(|| {
            "expected a JSON array of items or an object with an `items` array".to_string()
        })?;

        let mut items = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_object() {
                return Err(format!("item {}: expected an object", index));
            }

            let item = Item::deserialize(entry).map_err(|e| {
                match entry.get("id").and_then(Value::as_str) {
                    Some(id) => format!("item {} (id '{}'): {}", index, id, e),
                    None => format!("item {}: {}", index, e),
                }
            })?;

            match (item.posted, item.post_date.is_some()) {
                (true, false) => {
                    return Err(format!(
                        "item '{}' is marked posted but has no post_date",
                        item.id
                    ))
                }
                (false, true) => {
                    return Err(format!(
                        "item '{}' has a post_date but is not marked posted",
                        item.id
                    ))
                }
                _ => {}
            }

            if !seen.insert(item.id.clone()) {
                return Err(format!("duplicate item id '{}'", item.id));
            }

            items.push(item);
        }

        // A record that cannot be edited in place must fail now, before
        // anything is published
        let spans = splice::entry_spans(raw)?;
        if spans.len() != items.len() {
            return Err(format!(
                "found {} item objects but {} items",
                spans.len(),
                items.len()
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            items,
        })
    }

    /// Current text of the record, as it will be saved
    pub fn as_json(&self) -> &str {
        &self.raw
    }

    /// Items in persisted order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| ClipcastError::InvalidInput(format!("No item with id '{}'", id)))
    }

    fn spans(&self, index: usize) -> Result<EntrySpans> {
        splice::entry_spans(&self.raw)
            .ok()
            .and_then(|mut spans| (index < spans.len()).then(|| spans.swap_remove(index)))
            .ok_or_else(|| {
                ClipcastError::InvalidInput(format!("Queue entry {} cannot be located", index))
            })
    }

    fn apply_edits(
        &mut self,
        index: usize,
        edits: std::result::Result<Vec<Replacement>, String>,
    ) -> Result<()> {
        let edits = edits.map_err(|reason| {
            ClipcastError::InvalidInput(format!(
                "Queue entry {} cannot be updated: {}",
                index, reason
            ))
        })?;
        self.raw = splice::apply(&self.raw, edits);
        Ok(())
    }

    /// Record that an item has been posted.
    ///
    /// Fails if the item is unknown or already posted; an existing
    /// `post_date` is never overwritten.
    pub fn mark_posted(&mut self, id: &str, at: DateTime<Utc>) -> Result<&Item> {
        let index = self.position(id)?;
        if self.items[index].posted {
            return Err(ClipcastError::InvalidInput(format!(
                "Item '{}' is already posted",
                id
            )));
        }

        let spans = self.spans(index)?;
        let date = at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let edits = splice::mark_posted_edits(&self.raw, &spans, &date);
        self.apply_edits(index, edits)?;

        let item = &mut self.items[index];
        item.posted = true;
        item.post_date = Some(at);
        Ok(item)
    }

    /// Manually return an item to the unposted state.
    ///
    /// `post_date` becomes `null` if the key exists in the record and stays
    /// absent otherwise. Returns `false` when the item was not posted.
    pub fn reset(&mut self, id: &str) -> Result<bool> {
        let index = self.position(id)?;
        if !self.items[index].posted {
            return Ok(false);
        }

        let spans = self.spans(index)?;
        self.apply_edits(index, splice::reset_edits(&spans))?;

        let item = &mut self.items[index];
        item.posted = false;
        item.post_date = None;
        Ok(true)
    }

    pub fn stats(&self) -> QueueStats {
        let posted = self.items.iter().filter(|item| item.posted).count();
        let last_posted = self
            .items
            .iter()
            .filter(|item| item.posted)
            .max_by_key(|item| item.post_date);

        QueueStats {
            total: self.items.len(),
            posted,
            remaining: self.items.len() - posted,
            next_id: crate::selector::select_next(self).map(|item| item.id.clone()),
            last_posted_id: last_posted.map(|item| item.id.clone()),
            last_posted_at: last_posted.and_then(|item| item.post_date),
        }
    }
}

fn item_array(document: &Value) -> Option<&Vec<Value>> {
    match document {
        Value::Array(entries) => Some(entries),
        Value::Object(root) => root.get("items").and_then(Value::as_array),
        _ => None,
    }
}

/// Durable home of the queue record
pub trait QueueStorage: Send + Sync {
    /// Read and validate the record
    fn load(&self) -> std::result::Result<Queue, QueueError>;

    /// Replace the record. Either the whole queue is written or the
    /// previous record is left untouched.
    fn save(&self, queue: &Queue) -> std::result::Result<(), QueueError>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Queue record stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_failed(&self, source: std::io::Error) -> QueueError {
        QueueError::WriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

impl QueueStorage for JsonFileStore {
    fn load(&self) -> std::result::Result<Queue, QueueError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => QueueError::NotFound {
                path: self.path.clone(),
            },
            std::io::ErrorKind::InvalidData => QueueError::Corrupt {
                path: self.path.clone(),
                reason: "record is not valid UTF-8".to_string(),
            },
            _ => QueueError::ReadFailed {
                path: self.path.clone(),
                source: e,
            },
        })?;

        let queue = Queue::parse(&raw).map_err(|reason| QueueError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;

        tracing::debug!(
            path = %self.path.display(),
            items = queue.len(),
            "Loaded queue record"
        );
        Ok(queue)
    }

    fn save(&self, queue: &Queue) -> std::result::Result<(), QueueError> {
        let json = queue.as_json();

        // The temp file must sit on the same filesystem for the rename to be atomic
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| self.write_failed(e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| self.write_failed(e))?;
        temp.as_file().sync_all().map_err(|e| self.write_failed(e))?;

        if let Ok(metadata) = std::fs::metadata(&self.path) {
            std::fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(|e| self.write_failed(e))?;
        }

        temp.persist(&self.path)
            .map_err(|e| self.write_failed(e.error))?;

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "Saved queue record");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
