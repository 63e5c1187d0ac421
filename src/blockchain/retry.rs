// src/blockchain/retry.rs

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::ChainError;

/// Bounded-attempt, fixed-backoff retry settings for chain reads.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Run `operation` up to `policy.max_attempts` times, sleeping the fixed
/// delay between attempts, and return the last error on exhaustion.
///
/// The operation must be idempotent and side-effect-safe to repeat: this
/// wraps reads only, never a write submission.
pub async fn retry_operation<T, F, Fut>(mut operation: F, policy: RetryPolicy) -> Result<T, ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts.max(1) {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!(
                    "attempt {}/{} failed: {}",
                    attempt,
                    policy.max_attempts,
                    err.message()
                );
                last_error = Some(err);
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ChainError::Unknown("retry exhausted".to_string())))
}
