use crate::domain::error::DomainError;
use std::time::Duration;

/// Proof of lock ownership. Only the holder of `token` may release `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub key: String,
    pub token: String,
}

impl LockHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Single-flight lock. `ttl` bounds how long a crashed holder can block others.
#[async_trait::async_trait]
pub trait RunLock: Send + Sync {
    /// `Ok(None)` when another live holder owns `key`.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>, DomainError>;

    /// Compare-and-delete on `(key, token)`. Returns whether a lock was removed.
    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError>;
}
