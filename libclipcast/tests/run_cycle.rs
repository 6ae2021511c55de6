//! End-to-end tests for a posting run against a JSON record on disk
//!
//! These tests verify:
//! - The next unposted clip is published and recorded exactly once
//! - A fully-posted queue is a successful no-op
//! - Any publish failure leaves the record byte-for-byte unchanged
//! - A failed save after publishing is reported distinctly

use anyhow::Result;
use chrono::Utc;
use libclipcast::config::{Credentials, MediaSettings, RunConfig};
use libclipcast::coordinator::{RunCoordinator, RunOutcome, RunState};
use libclipcast::error::{ClipcastError, PlatformError, PublishError, QueueError};
use libclipcast::platforms::mock::{MockClient, MockConfig};
use libclipcast::store::{JsonFileStore, Queue, QueueStorage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BANANA_STAND: &str = r#"[
  {
    "id": "001",
    "filename": "huge-mistake.mp4",
    "character": "Gob",
    "quote": "I've made a huge mistake",
    "description": "Gob on the staircar",
    "posted": true,
    "post_date": "2024-03-01T12:00:00Z"
  },
  {
    "id": "002",
    "filename": "chicken.mp4",
    "character": "Lindsay",
    "quote": "Has anyone in this family ever even seen a chicken?",
    "posted": true,
    "post_date": "2024-03-02T12:00:00Z",
    "episode": "S01E04",
    "runtime": 12.50
  },
  {
    "id": "003",
    "filename": "banana-stand.mp4",
    "character": "George Sr.",
    "quote": "There's always money in the banana stand",
    "description": "George Sr. talking to Michael",
    "posted": false,
    "post_date": null,
    "notes": {
      "source": "S01E01",
      "approved": true
    }
  }
]
"#;

/// Helper to create a queue record and media directory
fn setup_test_env(record: &str, clips: &[&str]) -> Result<(TempDir, PathBuf, PathBuf)> {
    let temp_dir = TempDir::new()?;

    let queue_path = temp_dir.path().join("videos.json");
    fs::write(&queue_path, record)?;

    let media_dir = temp_dir.path().join("videos");
    fs::create_dir_all(&media_dir)?;
    for clip in clips {
        fs::write(media_dir.join(clip), b"\x00\x00\x00\x18ftypmp42")?;
    }

    Ok((temp_dir, queue_path, media_dir))
}

fn run_config(queue_path: &Path, media_dir: &Path) -> RunConfig {
    RunConfig {
        queue_path: queue_path.to_path_buf(),
        media: MediaSettings {
            dir: media_dir.to_path_buf(),
            max_upload_bytes: 50 * 1024 * 1024,
        },
        credentials: Credentials::new("bluth.bsky.social", "app-password"),
    }
}

fn coordinator(queue_path: &Path, media_dir: &Path, config: MockConfig) -> RunCoordinator {
    RunCoordinator::new(
        run_config(queue_path, media_dir),
        Box::new(MockClient::new(config)),
    )
}

#[tokio::test]
async fn test_banana_stand_scenario() -> Result<()> {
    let (_temp_dir, queue_path, media_dir) = setup_test_env(BANANA_STAND, &["banana-stand.mp4"])?;
    let mock = MockConfig::default();

    let run_start = Utc::now();
    let outcome = coordinator(&queue_path, &media_dir, mock.clone())
        .run_once()
        .await?;

    let post = match outcome {
        RunOutcome::Posted { item_id, post, .. } => {
            assert_eq!(item_id, "003");
            post
        }
        other => panic!("Expected Posted, got {:?}", other),
    };
    assert!(post.uri.starts_with("at://"));

    // Caption and alt text sent to the remote
    let drafts = mock.posted_drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(
        drafts[0].text,
        "\"There's always money in the banana stand\"\n\n— George Sr."
    );
    assert_eq!(drafts[0].embed.alt_text, "George Sr. talking to Michael");
    assert_eq!(mock.uploads()[0].mime_type, "video/mp4");

    // Exactly one flip, dated after the run started
    let before = Queue::parse(BANANA_STAND).unwrap();
    let after = JsonFileStore::new(&queue_path).load()?;
    assert_eq!(after.items()[0], before.items()[0]);
    assert_eq!(after.items()[1], before.items()[1]);
    let posted = after.get("003").unwrap();
    assert!(posted.posted);
    assert!(posted.post_date.unwrap() >= run_start);

    // Unknown fields carried through untouched
    let saved = fs::read_to_string(&queue_path)?;
    assert!(saved.contains("\"runtime\": 12.50"));
    assert!(saved.contains("\"notes\": {\n      \"source\": \"S01E01\",\n      \"approved\": true\n    }"));
    assert!(saved.ends_with("]\n"));

    Ok(())
}

const HAND_EDITED: &str = "[\n    {\n        \"id\": \"001\",\n        \"filename\": \"huge-mistake.mp4\",\n        \"character\": \"Gob\",\n        \"quote\": \"I\\u0027ve made a huge mistake\",\n        \"tag\": \"staircar\",\n        \"tag\": \"magic\",\n        \"posted\": true,\n        \"post_date\": \"2024-03-01T12:00:00Z\"\n    },\n    {\"id\": \"002\", \"filename\": \"chicken.mp4\", \"character\": \"Lindsay\", \"quote\": \"Caf\\u00e9 chicken\", \"link\": \"https:\\/\\/example.com\", \"posted\": true, \"post_date\": \"2024-03-02T12:00:00Z\"},\n    {\n        \"id\": \"003\",\n        \"filename\": \"banana-stand.mp4\",\n        \"character\": \"George Sr.\",\n        \"quote\": \"There's always money in the banana stand\",\n        \"posted\": false,\n        \"post_date\": null,\n        \"runtime\": 1.0e1\n    }\n]";

#[tokio::test]
async fn test_run_rewrites_only_the_posted_item_status() -> Result<()> {
    let (_temp_dir, queue_path, media_dir) = setup_test_env(HAND_EDITED, &["banana-stand.mp4"])?;

    coordinator(&queue_path, &media_dir, MockConfig::default())
        .run_once()
        .await?;

    let saved = fs::read_to_string(&queue_path)?;
    let json: serde_json::Value = serde_json::from_str(&saved)?;
    let date = json[2]["post_date"].as_str().unwrap();

    // First two items, their layout and escapes, are byte-identical
    let third = HAND_EDITED.find("    {\n        \"id\": \"003\"").unwrap();
    assert_eq!(&saved[..third], &HAND_EDITED[..third]);

    // The third differs only in its status values
    let restored = saved.replacen(
        &format!("\"posted\": true,\n        \"post_date\": \"{}\"", date),
        "\"posted\": false,\n        \"post_date\": null",
        1,
    );
    assert_eq!(restored, HAND_EDITED);

    Ok(())
}

#[tokio::test]
async fn test_fully_posted_queue_is_noop() -> Result<()> {
    let (temp_dir, queue_path, media_dir) = setup_test_env(BANANA_STAND, &["banana-stand.mp4"])?;

    coordinator(&queue_path, &media_dir, MockConfig::default())
        .run_once()
        .await?;
    let after_first = fs::read_to_string(&queue_path)?;
    let modified = fs::metadata(&queue_path)?.modified()?;

    let mock = MockConfig::default();
    let mut second = coordinator(&queue_path, &media_dir, mock.clone());
    let outcome = second.run_once().await?;

    assert_eq!(outcome, RunOutcome::NothingToPost);
    assert_eq!(second.state(), RunState::Done);
    assert!(mock.untouched());
    assert_eq!(fs::read_to_string(&queue_path)?, after_first);
    assert_eq!(fs::metadata(&queue_path)?.modified()?, modified);
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_empty_queue_is_noop() -> Result<()> {
    let (_temp_dir, queue_path, media_dir) = setup_test_env("[]\n", &[])?;
    let mock = MockConfig::default();

    let outcome = coordinator(&queue_path, &media_dir, mock.clone())
        .run_once()
        .await?;

    assert_eq!(outcome, RunOutcome::NothingToPost);
    assert!(mock.untouched());
    assert_eq!(fs::read_to_string(&queue_path)?, "[]\n");
    Ok(())
}

#[tokio::test]
async fn test_missing_media_fails_fast() -> Result<()> {
    let (_temp_dir, queue_path, media_dir) = setup_test_env(BANANA_STAND, &[])?;
    let mock = MockConfig::default();

    let error = coordinator(&queue_path, &media_dir, mock.clone())
        .run_once()
        .await
        .unwrap_err();

    match &error {
        ClipcastError::Publish(PublishError::MediaNotFound { path }) => {
            assert_eq!(path, &media_dir.join("banana-stand.mp4"));
        }
        other => panic!("Expected MediaNotFound, got {:?}", other),
    }
    assert_eq!(error.exit_code(), 3);
    assert_eq!(mock.upload_call_count(), 0);
    assert_eq!(mock.post_call_count(), 0);
    assert_eq!(fs::read_to_string(&queue_path)?, BANANA_STAND);

    Ok(())
}

#[tokio::test]
async fn test_publish_failures_leave_record_unchanged() -> Result<()> {
    let failures = vec![
        (
            "auth_error",
            MockConfig {
                auth_error: Some(PlatformError::Authentication("bad password".to_string())),
                ..Default::default()
            },
        ),
        (
            "upload_error",
            MockConfig {
                upload_error: Some(PlatformError::Network("connection reset".to_string())),
                ..Default::default()
            },
        ),
        (
            "submit_error",
            MockConfig {
                post_error: Some(PlatformError::Posting("record rejected".to_string())),
                ..Default::default()
            },
        ),
    ];

    for (kind, mock) in failures {
        let (_temp_dir, queue_path, media_dir) =
            setup_test_env(BANANA_STAND, &["banana-stand.mp4"])?;

        let mut run = coordinator(&queue_path, &media_dir, mock);
        let error = run.run_once().await.unwrap_err();

        assert_eq!(error.kind(), kind);
        assert_eq!(run.state(), RunState::Errored);
        assert_eq!(run.current_item(), Some("003"));
        assert_eq!(
            fs::read_to_string(&queue_path)?,
            BANANA_STAND,
            "record changed after {}",
            kind
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_auth_failure_exit_code() -> Result<()> {
    let (_temp_dir, queue_path, media_dir) = setup_test_env(BANANA_STAND, &["banana-stand.mp4"])?;
    let mock = MockConfig {
        expected_secret: Some("the-real-password".to_string()),
        ..Default::default()
    };

    let error = coordinator(&queue_path, &media_dir, mock.clone())
        .run_once()
        .await
        .unwrap_err();

    assert_eq!(error.exit_code(), 2);
    assert_eq!(mock.upload_call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unwritable_record_reports_persist_after_publish() -> Result<()> {
    let (_temp_dir, queue_path, media_dir) = setup_test_env(BANANA_STAND, &["banana-stand.mp4"])?;

    // Loads the real record but saves somewhere that cannot be written
    struct SplitStore {
        read: JsonFileStore,
        write: JsonFileStore,
    }

    impl QueueStorage for SplitStore {
        fn load(&self) -> std::result::Result<Queue, QueueError> {
            self.read.load()
        }

        fn save(&self, queue: &Queue) -> std::result::Result<(), QueueError> {
            self.write.save(queue)
        }

        fn location(&self) -> String {
            self.read.location()
        }
    }

    let store = SplitStore {
        read: JsonFileStore::new(&queue_path),
        write: JsonFileStore::new(media_dir.join("missing").join("videos.json")),
    };
    let mock = MockConfig::default();
    let mut run = coordinator(&queue_path, &media_dir, mock.clone()).with_store(Box::new(store));

    let error = run.run_once().await.unwrap_err();

    match &error {
        ClipcastError::PersistAfterPublish {
            item_id,
            post_uri,
            source,
        } => {
            assert_eq!(item_id, "003");
            assert!(post_uri.starts_with("at://"));
            assert!(matches!(source, QueueError::WriteFailed { .. }));
        }
        other => panic!("Expected PersistAfterPublish, got {:?}", other),
    }
    assert_eq!(error.exit_code(), 4);
    assert!(error.to_string().contains("avoid a duplicate post"));
    assert_eq!(mock.post_call_count(), 1);
    assert_eq!(fs::read_to_string(&queue_path)?, BANANA_STAND);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_ids_are_corrupt() -> Result<()> {
    let record = r#"[
  {"id": "1", "filename": "a.mp4", "character": "Buster", "quote": "Hey, brother", "posted": false},
  {"id": "1", "filename": "b.mp4", "character": "Buster", "quote": "I'm a monster!", "posted": false}
]"#;
    let (_temp_dir, queue_path, media_dir) = setup_test_env(record, &["a.mp4", "b.mp4"])?;
    let mock = MockConfig::default();

    let error = coordinator(&queue_path, &media_dir, mock.clone())
        .run_once()
        .await
        .unwrap_err();

    match &error {
        ClipcastError::Queue(QueueError::Corrupt { reason, .. }) => {
            assert!(reason.contains("duplicate item id '1'"));
        }
        other => panic!("Expected Corrupt, got {:?}", other),
    }
    assert!(mock.untouched());
    Ok(())
}

#[tokio::test]
async fn test_missing_record_is_not_found() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let queue_path = temp_dir.path().join("nope.json");

    let mut run = coordinator(&queue_path, temp_dir.path(), MockConfig::default());
    let error = run.run_once().await.unwrap_err();

    assert_eq!(error.kind(), "not_found");
    assert_eq!(error.exit_code(), 1);
    assert_eq!(run.state(), RunState::Errored);
    assert!(!queue_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_object_root_record_posts_in_order() -> Result<()> {
    let record = r#"{
  "show": "Arrested Development",
  "items": [
    {
      "id": "b",
      "filename": "b.webm",
      "character": "Tobias",
      "quote": "I just blue myself",
      "posted": false
    },
    {
      "id": "a",
      "filename": "a.mp4",
      "character": "Lucille",
      "quote": "I don't understand the question",
      "posted": false
    }
  ]
}
"#;
    let (_temp_dir, queue_path, media_dir) = setup_test_env(record, &["b.webm", "a.mp4"])?;
    let mock = MockConfig::default();

    let outcome = coordinator(&queue_path, &media_dir, mock.clone())
        .run_once()
        .await?;

    assert!(matches!(outcome, RunOutcome::Posted { ref item_id, .. } if item_id == "b"));
    assert_eq!(mock.uploads()[0].mime_type, "video/webm");

    let saved = fs::read_to_string(&queue_path)?;
    assert!(saved.starts_with("{\n  \"show\": \"Arrested Development\",\n  \"items\": ["));
    let queue = JsonFileStore::new(&queue_path).load()?;
    assert!(queue.get("b").unwrap().posted);
    assert!(!queue.get("a").unwrap().posted);

    Ok(())
}

#[tokio::test]
async fn test_two_runs_post_two_items() -> Result<()> {
    let record = r#"[
  {"id": "1", "filename": "1.mp4", "character": "Buster", "quote": "Hey, brother", "posted": false},
  {"id": "2", "filename": "2.mp4", "character": "Buster", "quote": "I'm a monster!", "posted": false}
]
"#;
    let (_temp_dir, queue_path, media_dir) = setup_test_env(record, &["1.mp4", "2.mp4"])?;

    let mut posted = Vec::new();
    for _ in 0..3 {
        let outcome = coordinator(&queue_path, &media_dir, MockConfig::default())
            .run_once()
            .await?;
        if let RunOutcome::Posted { item_id, .. } = outcome {
            posted.push(item_id);
        }
    }

    assert_eq!(posted, vec!["1", "2"]);
    let stats = JsonFileStore::new(&queue_path).load()?.stats();
    assert_eq!(stats.remaining, 0);
    assert_eq!(stats.next_id, None);
    Ok(())
}
