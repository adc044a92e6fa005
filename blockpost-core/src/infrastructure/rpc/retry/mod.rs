use crate::foundation::{ErrorClass, OperatorError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded exponential backoff: `initial * 2^(attempt-1)`, capped at `max_backoff`. No jitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, initial_backoff: Duration::from_millis(500), max_backoff: Duration::from_secs(10) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_backoff, max_backoff }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.initial_backoff.checked_mul(factor).unwrap_or(self.max_backoff).min(self.max_backoff)
    }

    /// Sum of the delays slept before attempt `n` (1-based) can start.
    pub fn total_backoff_before(&self, attempt: u32) -> Duration {
        (1..attempt).map(|a| self.backoff_for(a)).sum()
    }
}

/// Retry `op` while it fails with a transient error, up to `policy.max_attempts`.
///
/// Non-transient errors are returned immediately. Exhaustion yields `RetriesExhausted`.
pub async fn retry_transient<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, OperatorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OperatorError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("retry succeeded operation={} attempt={}", operation, attempt);
                }
                return Ok(value);
            }
            Err(err) if err.class() == ErrorClass::Transient => {
                if attempt >= max_attempts {
                    warn!("retry exhausted operation={} attempts={} error={}", operation, attempt, err);
                    return Err(OperatorError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                let delay = policy.backoff_for(attempt);
                warn!(
                    "transient failure operation={} attempt={} max_attempts={} backoff_ms={} error={}",
                    operation,
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    err
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
