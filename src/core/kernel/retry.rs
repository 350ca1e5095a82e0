use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tracing::warn;

/// Bounded exponential backoff: `base_delay * 2^(attempt - 1)` between
/// attempts, `max_attempts` attempts in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Single attempt, no backoff
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delays slept between consecutive attempts
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        (0..self.max_attempts.saturating_sub(1)).map(move |n| base * 2u32.saturating_pow(n))
    }
}

/// Run `operation` until it succeeds or the policy is exhausted, returning
/// the last error.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    let max_attempts = policy.max_attempts.max(1);
    Retry::spawn(policy.delays(), || {
        attempt += 1;
        let fut = operation();
        async move {
            let result = fut.await;
            if let Err(e) = &result {
                if attempt < max_attempts {
                    warn!(attempt, max_attempts, error = %e, "Request failed, retrying");
                }
            }
            result
        }
    })
    .await
}
