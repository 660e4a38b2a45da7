//! Provider capability and the values it exchanges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::resilience::retries::Retryable;
use crate::resilience::timeouts::Elapsed;

/// Outcome of a number verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Match,
    NoMatch,
    Indeterminate,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::NoMatch => "NO_MATCH",
            Self::Indeterminate => "INDETERMINATE",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when calling an upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The call did not finish within its deadline.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {0}")]
    Status(u16),

    /// The provider answered with a body we could not interpret.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider client could not be built.
    #[error("provider misconfigured: {0}")]
    Config(String),
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

impl From<Elapsed> for ProviderError {
    fn from(e: Elapsed) -> Self {
        Self::Timeout(e.0)
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A telecom data provider able to verify and look up subscriber numbers.
///
/// The primary and fallback roles are both filled by implementations of this
/// trait; which is which is decided by where they are plugged in.
pub trait TelecomProvider: Send + Sync {
    /// Identifier used in logs, metrics and breaker names.
    fn name(&self) -> &str;

    /// Check whether `number` (E.164) belongs to the current subscriber session.
    fn verify(&self, number: &str) -> impl Future<Output = ProviderResult<VerificationStatus>> + Send;

    /// Phone number (E.164) of the current subscriber session.
    fn fetch_subscriber_number(&self) -> impl Future<Output = ProviderResult<String>> + Send;
}
