//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an upstream provider:
//!     → circuit_breaker.rs (admit or reject; record one outcome per logical call)
//!     → retries.rs (re-run transient failures with backoff.rs delays)
//!     → timeouts.rs (deadline on every single attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only transient failures are retried
//! - Breakers are per upstream, never global
//! - Composition is explicit (guard.rs), built once per provider

pub mod backoff;
pub mod circuit_breaker;
pub mod guard;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CallError, CircuitBreaker, CircuitBreakerError, CircuitSnapshot, CircuitState};
pub use guard::GuardedCall;
pub use retries::{RetryPolicy, Retryable};
