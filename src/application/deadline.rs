//! Run-wide wall-clock budget.
//!
//! A [`Deadline`] is a monotonic instant checked at every stage boundary.
//! Each awaited call additionally races its own per-call timeout; the stricter
//! of the two always wins.

use crate::domain::error::DomainError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
}

/// Why a bounded call did not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elapsed {
    /// The call's own timeout fired first.
    Call(Duration),
    /// The shared deadline was reached.
    Deadline,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// A deadline that expires `reserve` earlier.
    pub fn shortened_by(&self, reserve: Duration) -> Deadline {
        let expires_at = self
            .expires_at
            .checked_sub(reserve)
            .unwrap_or_else(Instant::now);
        Deadline { expires_at }
    }

    /// Race `fut` against `min(per_call, remaining)`.
    pub async fn race<F: Future>(&self, per_call: Duration, fut: F) -> Result<F::Output, Elapsed> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(Elapsed::Deadline);
        }
        let (budget, kind) = if per_call < remaining {
            (per_call, Elapsed::Call(per_call))
        } else {
            (remaining, Elapsed::Deadline)
        };
        tokio::time::timeout(budget, fut).await.map_err(|_| kind)
    }

    /// Run a whole stage under the deadline. Expiry before or during the stage
    /// yields [`DomainError::TimeboxExceeded`].
    pub async fn timebox<T, F>(&self, stage: &'static str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        self.check(stage)?;
        match tokio::time::timeout(self.remaining(), fut).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::TimeboxExceeded { stage }),
        }
    }

    /// Stage-boundary check.
    pub fn check(&self, stage: &'static str) -> Result<(), DomainError> {
        if self.is_expired() {
            Err(DomainError::TimeboxExceeded { stage })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn per_call_timeout_wins_when_stricter() {
        let deadline = Deadline::after(Duration::from_secs(10));
        let result = deadline
            .race(Duration::from_millis(20), tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(Elapsed::Call(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn deadline_wins_when_stricter() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let result = deadline
            .race(Duration::from_secs(10), tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(Elapsed::Deadline));
    }

    #[tokio::test]
    async fn timebox_reports_stage() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let err = deadline
            .timebox("gather", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, DomainError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "timebox_exceeded:gather");
    }

    #[tokio::test]
    async fn expired_deadline_rejects_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.check("score").is_err());
        assert!(deadline.shortened_by(Duration::from_secs(5)).is_expired());
    }
}
