//! Number verification service library.
//!
//! Resilient access to a primary and a fallback telecom provider: per-client
//! rate limiting, a circuit breaker and retries around the primary, and
//! resolution of plain or hashed phone numbers to a verification status.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod providers;
pub mod resilience;
pub mod security;
pub mod verification;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use verification::{build_provider_client, ProviderClient, VerificationError};
