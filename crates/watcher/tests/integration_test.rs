//! Integration tests for the directory watcher
//!
//! These tests use temporary directories and real filesystem operations
//! to validate that notifications accumulate in the dirty set.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use vcstatus_watcher::DirectoryWatcherSet;

/// Helper to create a test file
async fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    tokio::fs::write(&path, content).await.unwrap();
    path
}

/// Poll until the set reports at least one event or the deadline passes
async fn wait_for_events(set: &DirectoryWatcherSet) -> bool {
    for _ in 0..40 {
        if set.number_of_changed_files() > 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

fn contains_file(paths: &[PathBuf], name: &str) -> bool {
    paths
        .iter()
        .any(|p| p.file_name().map(|n| n == name).unwrap_or(false))
}

fn watched(dir: &Path) -> DirectoryWatcherSet {
    let set = DirectoryWatcherSet::default();
    assert!(set.watch_directory(dir));
    set
}

#[tokio::test]
async fn test_file_creation_is_accumulated() {
    let temp_dir = TempDir::new().unwrap();
    let set = watched(temp_dir.path());

    // Wait a bit for watcher to stabilize
    tokio::time::sleep(Duration::from_millis(100)).await;

    create_test_file(&temp_dir, "created.txt", "hello").await;

    assert!(wait_for_events(&set).await, "no event observed");
    assert!(set.latest_change().is_some());
    let dirty = set.dump_dirty_files();
    assert!(contains_file(&dirty, "created.txt"), "dirty: {dirty:?}");
}

#[tokio::test]
async fn test_file_modification_is_accumulated() {
    let temp_dir = TempDir::new().unwrap();
    let file = create_test_file(&temp_dir, "existing.txt", "one").await;
    let set = watched(temp_dir.path());

    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::fs::write(&file, "one two").await.unwrap();

    assert!(wait_for_events(&set).await, "no event observed");
    let dirty = set.dump_dirty_files();
    assert!(contains_file(&dirty, "existing.txt"), "dirty: {dirty:?}");
}

#[tokio::test]
async fn test_file_deletion_is_accumulated() {
    let temp_dir = TempDir::new().unwrap();
    let file = create_test_file(&temp_dir, "doomed.txt", "bye").await;
    let set = watched(temp_dir.path());

    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::fs::remove_file(&file).await.unwrap();

    assert!(wait_for_events(&set).await, "no event observed");
    let dirty = set.dump_dirty_files();
    assert!(contains_file(&dirty, "doomed.txt"), "dirty: {dirty:?}");
}

#[tokio::test]
async fn test_metadata_directory_events_are_not_filtered() {
    let temp_dir = TempDir::new().unwrap();
    let metadata_dir = temp_dir.path().join(".git");
    tokio::fs::create_dir(&metadata_dir).await.unwrap();
    let set = watched(temp_dir.path());

    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::fs::write(metadata_dir.join("index"), "state").await.unwrap();

    assert!(wait_for_events(&set).await, "no event observed");
    let dirty = set.dump_dirty_files();
    assert!(contains_file(&dirty, "index"), "dirty: {dirty:?}");
}

#[tokio::test]
async fn test_suspended_watching_drops_events() {
    let temp_dir = TempDir::new().unwrap();
    let set = watched(temp_dir.path());
    set.enable_watching(false);

    tokio::time::sleep(Duration::from_millis(100)).await;
    create_test_file(&temp_dir, "build-output.o", "bits").await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(set.number_of_changed_files(), 0);
    assert_eq!(set.len(), 1);
}
