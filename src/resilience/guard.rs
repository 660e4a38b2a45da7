//! Breaker-over-retry composition for one upstream.
//!
//! ```text
//! guarded call = breaker.wrap(retry.wrap(raw call))
//! ```
//!
//! The breaker admits the whole logical call once and records a single
//! outcome for it, however many attempts the retry policy spent inside.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::resilience::circuit_breaker::{CallError, CircuitBreaker, CircuitSnapshot};
use crate::resilience::retries::{RetryPolicy, Retryable};

/// A circuit breaker and retry policy composed once, at construction.
#[derive(Debug, Clone)]
pub struct GuardedCall {
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl GuardedCall {
    pub fn new(breaker: Arc<CircuitBreaker>, retry: RetryPolicy) -> Self {
        Self { breaker, retry }
    }

    /// Breaker only, single attempt.
    pub fn breaker_only(breaker: Arc<CircuitBreaker>) -> Self {
        Self::new(breaker, RetryPolicy::no_retry())
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        self.breaker.snapshot()
    }

    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        self.breaker.call(|| self.retry.execute(op)).await
    }
}
