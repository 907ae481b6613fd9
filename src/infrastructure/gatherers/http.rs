//! HTTP fetcher shared by the gatherers: hard per-request timeout plus bounded
//! retry with exponential backoff on transient failures.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::domain::error::GatherError;

const MAX_JITTER_MS: u64 = 250;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: config.retry_base_delay,
            request_timeout: config.source_timeout,
        }
    }

    /// `base * 2^attempt` plus up to 250ms of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(attempt);
        exp + Duration::from_millis(fastrand::u64(0..MAX_JITTER_MS))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, policy: RetryPolicy) -> Self {
        Self {
            client: Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_default(),
            policy,
        }
    }

    /// Send the request built by `build`, retrying transient failures.
    /// Non-retryable statuses fail immediately.
    pub async fn send<F>(&self, label: &str, build: F) -> Result<reqwest::Response, GatherError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let attempts = self.policy.attempts;
        let mut last_err = GatherError::Network(format!("{label}: no attempt made"));

        for attempt in 0..attempts {
            let result = tokio::time::timeout(self.policy.request_timeout, build(&self.client).send()).await;
            let err = match result {
                Ok(Ok(resp)) if resp.status().is_success() => {
                    debug!(label, attempt = attempt + 1, "fetched");
                    return Ok(resp);
                }
                Ok(Ok(resp)) => {
                    let status = resp.status();
                    let err = GatherError::Network(format!("{label}: HTTP {status}"));
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Ok(Err(e)) => GatherError::Network(format!("{label}: {e}")),
                Err(_) => GatherError::Timeout(self.policy.request_timeout.as_millis() as u64),
            };

            if attempt + 1 < attempts {
                let delay = self.policy.backoff(attempt);
                warn!(
                    label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            last_err = err;
        }
        Err(last_err)
    }

    pub async fn get_json<T, F>(&self, label: &str, build: F) -> Result<T, GatherError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let resp = self.send(label, build).await?;
        resp.json::<T>()
            .await
            .map_err(|e| GatherError::Parse(format!("{label}: {e}")))
    }

    pub async fn get_bytes<F>(&self, label: &str, build: F) -> Result<Vec<u8>, GatherError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let resp = self.send(label, build).await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| GatherError::Network(format!("{label}: {e}")))
    }
}

/// Swallow a failed request to `None` with a warning. Used where one failing
/// endpoint must not sink the rest of a gatherer's batch.
pub fn or_skip<T>(source: &str, label: &str, result: Result<T, GatherError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(source, label, error = %e, "request failed, skipping");
            None
        }
    }
}
