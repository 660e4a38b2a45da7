//! Errors surfaced by the verification layer to the ingress.

use thiserror::Error;

/// Errors a verification request can end in.
///
/// Provider failures never appear here directly: the client recovers them
/// with the fallback, and only total unavailability is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The caller exhausted its request budget.
    #[error("rate limit exceeded, try again later")]
    RateLimited,

    /// The request was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Neither provider could answer.
    #[error("subscriber number is unavailable from all providers")]
    Unavailable,
}

impl VerificationError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited => "RATE_LIMITED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Unavailable => "PROVIDER_UNAVAILABLE",
        }
    }
}
