//! HTTP ingress for the verification service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → security/rate_limit.rs (per-client admission, /api routes only)
//!     → handlers.rs (decode, call verification layer)
//!     → response.rs (JSON bodies, error → status mapping)
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{AppState, HttpServer};
