//! Retry with exponential backoff.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AiError, AiResult};
use crate::metrics;

/// Backoff policy for AI calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each following retry.
    pub base_delay: Duration,
    /// Cap for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Source of backoff delays. Swapped out in tests to avoid real sleeps.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` under `policy`.
///
/// Retryable errors are retried until attempts run out; the final error (or
/// the first non-retryable one) is returned as [`AiError::ExternalApi`].
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut operation: F,
) -> AiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AiResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                metrics::record_request(operation_name, "success");
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for_retry(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "AI request failed, retrying: {}",
                    e
                );
                metrics::record_retry(operation_name);
                sleeper.sleep(delay).await;
            }
            Err(e) => {
                debug!(operation = operation_name, attempt, "AI request gave up: {}", e);
                metrics::record_request(operation_name, "error");
                return Err(AiError::external_api(operation_name, attempt, e.to_string()));
            }
        }
    }
}
