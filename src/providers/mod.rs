//! Upstream telecom providers.
//!
//! # Data Flow
//! ```text
//! verification/client.rs
//!     → types.rs (TelecomProvider capability)
//!     → http.rs (reqwest call with per-call deadline)
//!     → provider REST API
//! ```

pub mod http;
pub mod types;

pub use http::HttpTelecomProvider;
pub use types::{ProviderError, ProviderResult, TelecomProvider, VerificationStatus};
