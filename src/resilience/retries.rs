//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is transient (timeouts, connection errors)
//! - Re-run the operation up to `max_attempts` total attempts
//! - Wait between attempts without blocking other tasks
//!
//! # Design Decisions
//! - Business failures are never retried
//! - Fixed delay by default; exponential backoff is opt-in
//! - The last error is surfaced once attempts are exhausted

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::{BackoffStrategy, RetryConfig};
use crate::resilience::backoff::delay_after;

/// Errors that can say whether another attempt might succeed.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Per-call bookkeeping, dropped when the call ends.
#[derive(Debug)]
pub struct RetryAttempt<E> {
    pub attempts_made: u32,
    pub last_error: Option<E>,
}

/// Retry configuration for a single logical call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait: Duration,
    max_wait: Duration,
    backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            max_wait: wait,
            backoff: BackoffStrategy::Fixed,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            wait: Duration::from_millis(config.wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
            backoff: config.backoff,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        self.execute_recorded(op).await.0
    }

    /// Like [`execute`](Self::execute), also returning the number of attempts made.
    pub async fn execute_recorded<F, Fut, T, E>(&self, mut op: F) -> (Result<T, E>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = RetryAttempt {
            attempts_made: 0,
            last_error: None,
        };

        loop {
            attempt.attempts_made += 1;
            match op().await {
                Ok(value) => {
                    if let Some(previous) = attempt.last_error.take() {
                        tracing::info!(
                            attempts = attempt.attempts_made,
                            previous_error = %previous,
                            "Call succeeded after retry"
                        );
                    }
                    return (Ok(value), attempt.attempts_made);
                }
                Err(e) if e.is_transient() && attempt.attempts_made < self.max_attempts => {
                    let delay = delay_after(self.backoff, attempt.attempts_made, self.wait, self.max_wait);
                    tracing::warn!(
                        attempt = attempt.attempts_made,
                        max_attempts = self.max_attempts,
                        delay = ?delay,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    attempt.last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(attempts = attempt.attempts_made, error = %e, "Retries exhausted");
                    }
                    return (Err(e), attempt.attempts_made);
                }
            }
        }
    }
}
