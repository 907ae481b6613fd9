//! Cross-connection behavior of the SQLite run lock.

use rusqlite::Connection;
use std::time::Duration;
use stockpulse::domain::ports::run_lock::{LockHandle, RunLock};
use stockpulse::infrastructure::sqlite::run_lock::SqliteRunLock;

fn lock_at(path: &std::path::Path) -> SqliteRunLock {
    SqliteRunLock::new(Connection::open(path).unwrap()).unwrap()
}

#[tokio::test]
async fn second_connection_is_refused_while_held() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.db");
    let a = lock_at(&path);
    let b = lock_at(&path);

    let held = a.acquire("pipeline:kr", Duration::from_secs(60)).await.unwrap().unwrap();
    assert!(b.acquire("pipeline:kr", Duration::from_secs(60)).await.unwrap().is_none());
    // Other keys are independent.
    assert!(b.acquire("pipeline:us", Duration::from_secs(60)).await.unwrap().is_some());

    assert!(a.release(&held).await.unwrap());
    assert!(b.acquire("pipeline:kr", Duration::from_secs(60)).await.unwrap().is_some());
}

#[tokio::test]
async fn release_requires_the_owning_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.db");
    let a = lock_at(&path);
    let b = lock_at(&path);

    let held = a.acquire("pipeline:kr", Duration::from_secs(60)).await.unwrap().unwrap();
    let forged = LockHandle::new("pipeline:kr");
    assert!(!b.release(&forged).await.unwrap());
    assert!(b.acquire("pipeline:kr", Duration::from_secs(60)).await.unwrap().is_none());

    assert!(a.release(&held).await.unwrap());
    assert!(!a.release(&held).await.unwrap());
}

#[tokio::test]
async fn expired_lock_can_be_taken_over() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.db");
    let a = lock_at(&path);
    let b = lock_at(&path);

    let stale = a.acquire("pipeline:kr", Duration::from_millis(30)).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let fresh = b.acquire("pipeline:kr", Duration::from_secs(60)).await.unwrap().unwrap();
    assert_ne!(stale.token, fresh.token);
    // The stale holder can no longer release the new owner's lock.
    assert!(!a.release(&stale).await.unwrap());
}
