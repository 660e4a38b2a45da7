//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /api request:
//!     → rate_limit.rs (client key → token bucket → admit or 429)
//!     → handlers
//! ```
//!
//! # Design Decisions
//! - Buckets are keyed by API key when present, else by peer IP
//! - Rejection happens before any provider is contacted
//! - The bucket map is bounded (idle sweep + LRU cap)

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
