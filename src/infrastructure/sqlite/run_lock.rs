use crate::domain::error::DomainError;
use crate::domain::ports::run_lock::{LockHandle, RunLock};
use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::Mutex;
use std::time::Duration;

/// Cross-process single-flight lock backed by the `run_locks` table.
pub struct SqliteRunLock {
    conn: Mutex<Connection>,
}

impl SqliteRunLock {
    pub fn new(conn: Connection) -> Result<Self, DomainError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS run_locks (
                key TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait::async_trait]
impl RunLock for SqliteRunLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>, DomainError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let now_ms = Utc::now().timestamp_millis();
        let expires_at = now_ms + ttl.as_millis() as i64;
        let handle = LockHandle::new(key);

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM run_locks WHERE key = ?1 AND expires_at <= ?2",
            params![key, now_ms],
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO run_locks (key, token, expires_at) VALUES (?1, ?2, ?3)",
            params![key, handle.token, expires_at],
        )?;
        tx.commit()?;

        Ok((inserted == 1).then_some(handle))
    }

    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let removed = conn.execute(
            "DELETE FROM run_locks WHERE key = ?1 AND token = ?2",
            params![handle.key, handle.token],
        )?;
        Ok(removed > 0)
    }
}
