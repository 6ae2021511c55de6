//! Integration tests for clip-queue commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const QUEUE: &str = r#"[
  {
    "id": "001",
    "filename": "huge-mistake.mp4",
    "character": "Gob",
    "quote": "I've made a huge mistake",
    "posted": true,
    "post_date": "2024-03-01T12:00:00Z",
    "season": 1
  },
  {
    "id": "002",
    "filename": "chicken.mp4",
    "character": "Lindsay",
    "quote": "Has anyone in this family ever even seen a chicken?",
    "posted": true,
    "post_date": "2024-03-02T12:00:00Z"
  },
  {
    "id": "003",
    "filename": "banana-stand.mp4",
    "character": "George Sr.",
    "quote": "There's always money in the banana stand",
    "posted": false,
    "post_date": null
  }
]
"#;

/// Helper to create a test environment with a queue record
fn setup_test_env(record: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let queue_path = temp_dir.path().join("videos.json");
    fs::write(&queue_path, record).unwrap();
    (temp_dir, queue_path)
}

fn clip_queue(home: &Path, queue_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clip-queue").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("xdg"))
        .env_remove("CLIPCAST_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--queue")
        .arg(queue_path);
    cmd
}

#[test]
fn test_list_text() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("001 | posted 2024-03-01 12:00 | Gob"))
        .stdout(predicate::str::contains("003 | pending | George Sr."));
}

#[test]
fn test_list_pending_json() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    let output = clip_queue(temp_dir.path(), &queue_path)
        .args(["list", "--pending", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "003");
    assert_eq!(items[0]["posted"], false);
}

#[test]
fn test_list_invalid_format() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .args(["list", "--format", "xml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid format"));
}

#[test]
fn test_stats_text() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:     3"))
        .stdout(predicate::str::contains("Posted:    2"))
        .stdout(predicate::str::contains("Remaining: 1"))
        .stdout(predicate::str::contains("Next:      003"))
        .stdout(predicate::str::contains("Last:      002"));
}

#[test]
fn test_stats_json() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    let output = clip_queue(temp_dir.path(), &queue_path)
        .args(["stats", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 3);
    assert_eq!(json["remaining"], 1);
    assert_eq!(json["next_id"], "003");
}

#[test]
fn test_next_shows_caption() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("003 | banana-stand.mp4"))
        .stdout(predicate::str::contains(
            "\"There's always money in the banana stand\"\n\n— George Sr.",
        ));
}

#[test]
fn test_next_when_everything_posted() {
    let (temp_dir, queue_path) = setup_test_env("[]");

    clip_queue(temp_dir.path(), &queue_path)
        .args(["next", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn test_reset_requires_force() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .args(["reset", "001"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("--force"));

    assert_eq!(fs::read_to_string(&queue_path).unwrap(), QUEUE);
}

#[test]
fn test_reset_clears_posted_state() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .args(["reset", "001", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reset 001"));

    let saved = fs::read_to_string(&queue_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json[0]["posted"], false);
    assert!(json[0]["post_date"].is_null());
    assert_eq!(json[0]["season"], 1);
    assert_eq!(json[1]["posted"], true);

    // Only the reset item changed
    let expected = QUEUE.replacen(
        "\"posted\": true,\n    \"post_date\": \"2024-03-01T12:00:00Z\"",
        "\"posted\": false,\n    \"post_date\": null",
        1,
    );
    assert_eq!(saved, expected);

    // It is now first in line again
    clip_queue(temp_dir.path(), &queue_path)
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("001 | huge-mistake.mp4"));
}

#[test]
fn test_reset_unposted_is_noop() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .args(["reset", "003", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to reset"));

    assert_eq!(fs::read_to_string(&queue_path).unwrap(), QUEUE);
}

#[test]
fn test_reset_unknown_id() {
    let (temp_dir, queue_path) = setup_test_env(QUEUE);

    clip_queue(temp_dir.path(), &queue_path)
        .args(["reset", "999", "--force"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No item with id '999'"));
}

#[test]
fn test_missing_record() {
    let temp_dir = TempDir::new().unwrap();
    let queue_path = temp_dir.path().join("missing.json");

    clip_queue(temp_dir.path(), &queue_path)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Queue record not found"));
}

#[test]
fn test_corrupt_record() {
    let (temp_dir, queue_path) = setup_test_env(r#"[{"id": "1"}]"#);

    clip_queue(temp_dir.path(), &queue_path)
        .arg("stats")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("corrupt"));
}
