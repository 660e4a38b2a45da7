//! Number verification subsystem.
//!
//! # Data Flow
//! ```text
//! VerificationRequest
//!     → resolver.rs (pick plain or hashed path, validate input)
//!     → client.rs (primary under breaker + retry, then fallback)
//!     → VerificationStatus / VerificationError
//! ```

pub mod client;
pub mod error;
pub mod phone;
pub mod resolver;

pub use client::{build_provider_client, HttpProviderClient, ProviderClient};
pub use error::VerificationError;
pub use resolver::{resolve, VerificationRequest};
