use std::future::Future;
use std::time::Duration;

use log::{error, warn};

use crate::model_client::ModelError;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Bounded retry of transient model-endpoint failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                max: Duration::from_secs(4),
            },
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn should_retry(&self, err: &ModelError) -> bool {
        err.is_transient()
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or the attempt budget is spent. The closure receives the 1-based
    /// attempt number. The last error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ModelError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err) && attempt < max_attempts => {
                    let delay = self.backoff.delay_after(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if self.should_retry(&err) {
                        error!("Max retries reached after {} attempts. Request failed.", attempt);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn connection_error() -> ModelError {
        ModelError::Connection {
            endpoint: "http://localhost:11434".into(),
            reason: "connection refused".into(),
        }
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(4),
        };
        assert_eq!(backoff.delay_after(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_after(2), Duration::from_secs(1));
        assert_eq!(backoff.delay_after(3), Duration::from_secs(2));
        assert_eq!(backoff.delay_after(10), Duration::from_secs(4));
        assert_eq!(backoff.delay_after(u32::MAX), Duration::from_secs(4));
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        assert_eq!(RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO)).max_attempts, 1);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_use_full_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(1)));
        let result: Result<(), _> = policy
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_error()) }
            })
            .await;
        assert!(matches!(result, Err(ModelError::Connection { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_last_attempt() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(1)));
        let result = policy
            .execute(|attempt| async move {
                if attempt < 3 {
                    Err(ModelError::Timeout { timeout: Duration::from_secs(120) })
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), _> = policy
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ModelError::Server {
                        status: 500,
                        message: "internal error".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(ModelError::Server { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
