//! Scheduler loop against an in-memory backend

mod support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use support::{record, repository, Call, FakeBackend};
use vcstatus::{PendingCommand, StatusScheduler};
use vcstatus_core::status::FileStatus;

const ROOT: &str = "/nonexistent-vcstatus/scheduled";

#[tokio::test]
async fn test_scheduler_runs_queued_commands_and_notifies() {
    let backend = FakeBackend::new();
    backend.add_root(ROOT, "main");
    let path = PathBuf::from(ROOT).join("a.txt");
    backend.set_file(record(&path, FileStatus::Unmodified));

    let repository = Arc::new(repository(&backend));
    repository.add_root_directory(&PathBuf::from(ROOT));
    let mut changes = repository.subscribe();

    let scheduler = StatusScheduler::spawn(Arc::clone(&repository), Duration::from_millis(10));
    repository.enqueue(PendingCommand::AddFiles(vec![path.clone()]));

    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("no change notification")
        .expect("channel closed");

    assert_eq!(repository.file_status(&path), FileStatus::Added);
    assert!(backend.calls().contains(&Call::Add(vec![path])));

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_the_loop() {
    let backend = FakeBackend::new();
    let repository = Arc::new(repository(&backend));

    let scheduler = StatusScheduler::spawn(repository, Duration::from_millis(10));
    let token = scheduler.cancellation_token();
    assert!(!token.is_cancelled());

    tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
        .await
        .expect("scheduler did not stop");
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_idle_ticks_do_not_notify() {
    let backend = FakeBackend::new();
    backend.add_root(ROOT, "main");
    let repository = Arc::new(repository(&backend));
    repository.add_root_directory(&PathBuf::from(ROOT));
    let mut changes = repository.subscribe();

    let scheduler = StatusScheduler::spawn(Arc::clone(&repository), Duration::from_millis(10));
    let received = tokio::time::timeout(Duration::from_millis(200), changes.recv()).await;
    assert!(received.is_err());

    scheduler.shutdown().await;
}
