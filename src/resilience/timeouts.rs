//! Timeout enforcement.
//!
//! Every upstream call carries a deadline. An elapsed deadline is its own
//! error variant and counts as a transient failure for the retry policy.

use std::future::Future;
use std::time::Duration;

/// Marker for an elapsed per-call deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Run `fut` with a deadline, mapping expiry into the caller's error type.
pub async fn with_deadline<F, T, E>(limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(E::from(Elapsed(limit))),
    }
}
