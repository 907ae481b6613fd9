use crate::domain::error::DomainError;
use crate::domain::ports::run_lock::{LockHandle, RunLock};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Single-process lock with the same token and TTL semantics as the SQLite one.
#[derive(Default)]
pub struct InMemoryRunLock {
    held: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryRunLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RunLock for InMemoryRunLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>, DomainError> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let now = Instant::now();
        if let Some((_, expires_at)) = held.get(key) {
            if *expires_at > now {
                return Ok(None);
            }
        }
        let handle = LockHandle::new(key);
        held.insert(key.to_string(), (handle.token.clone(), now + ttl));
        Ok(Some(handle))
    }

    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        match held.get(&handle.key) {
            Some((token, _)) if *token == handle.token => {
                held.remove(&handle.key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
