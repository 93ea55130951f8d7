//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use fitfind_core::FitFindError;
use fitfind_core::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_MS, MAX_RETRY_DELAY_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-based). The first attempt has none.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails terminally, or attempts run out.
///
/// Only errors for which [`FitFindError::is_retryable`] holds are retried.
///
/// # Errors
/// Returns the first terminal error, or the last retryable one once the
/// attempts are exhausted.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    description: &str,
    mut op: F,
) -> Result<T, FitFindError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FitFindError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tracing::warn!(
                operation = description,
                attempt = attempt + 1,
                max_attempts,
                "retrying after {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                tracing::debug!(operation = description, error = %err, "transient failure");
                attempt += 1;
            },
            Err(err) => {
                if err.is_retryable() {
                    tracing::warn!(operation = description, error = %err, "all retries exhausted");
                }
                return Err(err);
            },
        }
    }
}
