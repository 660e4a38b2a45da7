//! Circuit breaker for upstream provider protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: provider assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: window holds >= minimum_calls outcomes and failure rate >= threshold
//! Open → Half-Open: wait_duration elapsed since opening (checked lazily)
//! Half-Open → Closed: a trial call succeeds (window cleared)
//! Half-Open → Open: a trial call fails
//! ```
//!
//! One breaker per upstream. Calls rejected while open never reach the
//! provider and are not recorded in the window.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        })
    }
}

/// Rejection issued without invoking the guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerError {
    #[error("circuit '{name}' is open, trial calls allowed in {retry_after:?}")]
    CircuitOpen { name: String, retry_after: Duration },

    #[error("circuit '{name}' is half-open and all {permitted} trial calls are in flight")]
    HalfOpenLimitReached { name: String, permitted: u32 },
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug)]
pub enum CallError<E> {
    /// The breaker refused the call.
    Rejected(CircuitBreakerError),
    /// The operation ran and failed.
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "{e}"),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CallError<E> {}

/// Point-in-time view of a breaker, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// `true` marks a failure; oldest outcome at the front.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_trials_used: u32,
    /// Bumped on every entry into half-open so stale permits can be told apart.
    half_open_generation: u64,
}

impl BreakerState {
    fn failures(&self) -> usize {
        self.window.iter().filter(|failed| **failed).count()
    }

    fn record(&mut self, failed: bool, window_size: usize) {
        self.window.push_back(failed);
        while self.window.len() > window_size {
            self.window.pop_front();
        }
    }

    fn should_trip(&self, config: &CircuitBreakerConfig) -> bool {
        let calls = self.window.len();
        calls >= config.minimum_calls
            && self.failures() as f64 / calls as f64 >= config.failure_threshold
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.half_open_trials_used = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.window.clear();
        self.opened_at = None;
        self.half_open_trials_used = 0;
    }

    /// Open → Half-Open once the wait has elapsed.
    fn refresh(&mut self, now: Instant, wait: Duration) {
        if self.state != CircuitState::Open {
            return;
        }
        let opened_at = self.opened_at.unwrap_or(now);
        if now.saturating_duration_since(opened_at) >= wait {
            self.state = CircuitState::HalfOpen;
            self.half_open_trials_used = 0;
            self.half_open_generation += 1;
        }
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`].
///
/// Must be settled with [`Permit::success`] or [`Permit::failure`]. A permit
/// dropped unsettled (e.g. the caller was cancelled) hands its half-open trial
/// slot back without recording an outcome.
#[must_use = "a permit must be settled with success() or failure()"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial_generation: Option<u64>,
    settled: bool,
}

impl Permit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_outcome(false, self.trial_generation);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_outcome(true, self.trial_generation);
    }

    /// Whether this call is a half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial_generation.is_some()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(generation) = self.trial_generation {
            let mut inner = self.breaker.lock();
            if inner.state == CircuitState::HalfOpen
                && inner.half_open_generation == generation
                && inner.half_open_trials_used > 0
            {
                inner.half_open_trials_used -= 1;
            }
        }
    }
}

/// Failure-rate circuit breaker guarding a single upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(config.window_size),
                opened_at: None,
                half_open_trials_used: 0,
                half_open_generation: 0,
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Every update completes before the guard is released, so a poisoned
        // state is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, applying the timed Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        inner.refresh(Instant::now(), self.config.wait_duration());
        inner.state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut inner = self.lock();
        inner.refresh(Instant::now(), self.config.wait_duration());
        CircuitSnapshot {
            name: self.name.clone(),
            state: inner.state,
            buffered_calls: inner.window.len(),
            failed_calls: inner.failures(),
        }
    }

    /// Ask to let one call through.
    pub fn try_acquire(&self) -> Result<Permit<'_>, CircuitBreakerError> {
        let now = Instant::now();
        let wait = self.config.wait_duration();
        let mut inner = self.lock();
        let previous = inner.state;
        inner.refresh(now, wait);
        if previous == CircuitState::Open && inner.state == CircuitState::HalfOpen {
            tracing::info!(circuit = %self.name, "Circuit half-open, allowing trial calls");
        }

        match inner.state {
            CircuitState::Closed => Ok(Permit {
                breaker: self,
                trial_generation: None,
                settled: false,
            }),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                Err(CircuitBreakerError::CircuitOpen {
                    name: self.name.clone(),
                    retry_after: wait.saturating_sub(elapsed),
                })
            }
            CircuitState::HalfOpen => {
                let permitted = self.config.permitted_half_open_calls;
                if inner.half_open_trials_used >= permitted {
                    return Err(CircuitBreakerError::HalfOpenLimitReached {
                        name: self.name.clone(),
                        permitted,
                    });
                }
                inner.half_open_trials_used += 1;
                Ok(Permit {
                    breaker: self,
                    trial_generation: Some(inner.half_open_generation),
                    settled: false,
                })
            }
        }
    }

    /// Record an outcome. Only a trial of the current half-open generation
    /// may move a half-open breaker.
    fn on_outcome(&self, failed: bool, trial_generation: Option<u64>) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.record(failed, self.config.window_size);
        let current_trial = trial_generation == Some(inner.half_open_generation);

        let transition = match inner.state {
            CircuitState::Closed if inner.should_trip(&self.config) => {
                inner.open(now);
                Some(CircuitState::Open)
            }
            CircuitState::HalfOpen if current_trial && failed => {
                inner.open(now);
                Some(CircuitState::Open)
            }
            CircuitState::HalfOpen if current_trial => {
                inner.close();
                Some(CircuitState::Closed)
            }
            // Closed without tripping, a late outcome while open, or a
            // non-trial outcome while half-open.
            _ => None,
        };
        drop(inner);

        match transition {
            Some(CircuitState::Open) => {
                tracing::warn!(
                    circuit = %self.name,
                    wait = ?self.config.wait_duration(),
                    "Circuit opened"
                );
                metrics::record_circuit_opened(&self.name);
            }
            Some(_) => tracing::info!(circuit = %self.name, "Circuit closed"),
            None => {}
        }
    }

    /// Run `op` under this breaker.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().map_err(CallError::Rejected)?;
        match op().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(e) => {
                permit.failure();
                Err(CallError::Failed(e))
            }
        }
    }
}
