// ABOUTME: Bounded exponential retry for backend calls
// ABOUTME: Retries transient failures a fixed number of times using the backoff crate

use std::future::Future;
use std::time::Duration;

use backoff::{future::retry, ExponentialBackoffBuilder};
use tracing::warn;

use crate::service::AIServiceResult;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn none() -> Self {
        Self::with_max_retries(0)
    }
}

/// Run `operation`, retrying retryable errors with exponential backoff
/// until `policy.max_retries` extra attempts have been spent.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> AIServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AIServiceResult<T>>,
{
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_interval(policy.max_interval)
        .with_max_elapsed_time(None)
        .build();

    let max_retries = policy.max_retries;
    let mut attempt: u32 = 0;

    retry(backoff, || {
        attempt += 1;
        let current = attempt;
        let fut = operation();
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() && current <= max_retries => {
                    warn!("Backend call failed (attempt {}), retrying: {}", current, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        }
    })
    .await
}
