use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Reasoning service error: {0}")]
    Reasoning(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The run-wide wall-clock budget ran out while `stage` was pending.
    #[error("timebox_exceeded:{stage}")]
    TimeboxExceeded { stage: &'static str },
}

impl DomainError {
    pub fn is_timebox(&self) -> bool {
        matches!(self, DomainError::TimeboxExceeded { .. })
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Parse(e.to_string())
    }
}

/// Failure of a single source gatherer. Never escalated past the coordinator.
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl GatherError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatherError::Network(_) | GatherError::Timeout(_))
    }
}
