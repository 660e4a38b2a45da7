//! Primary/fallback provider access.
//!
//! ```text
//! primary:  breaker(retry(provider call))   composed once, at construction
//! fallback: provider call                   or breaker(provider call) when guarded
//! ```
//!
//! Any primary failure, breaker rejections included, moves the request to
//! the fallback. Fallback failures end the chain: `verify` reports
//! `INDETERMINATE`, `fetch_subscriber_number` reports `Unavailable`.

use std::future::Future;
use std::sync::Arc;

use crate::config::{CircuitBreakerConfig, ServiceConfig};
use crate::observability::metrics;
use crate::providers::{HttpTelecomProvider, ProviderError, ProviderResult, TelecomProvider, VerificationStatus};
use crate::resilience::{CallError, CircuitBreaker, CircuitSnapshot, GuardedCall, RetryPolicy};
use crate::verification::error::VerificationError;

const OP_VERIFY: &str = "verify";
const OP_FETCH_NUMBER: &str = "fetch_subscriber_number";

/// Resilient access to a primary and a fallback provider.
pub struct ProviderClient<P, F> {
    primary: P,
    fallback: F,
    primary_guard: GuardedCall,
    /// Present only when the fallback is configured to sit behind its own breaker.
    fallback_guard: Option<GuardedCall>,
}

/// Client over the HTTP provider implementation.
pub type HttpProviderClient = ProviderClient<HttpTelecomProvider, HttpTelecomProvider>;

impl<P, F> ProviderClient<P, F>
where
    P: TelecomProvider,
    F: TelecomProvider,
{
    pub fn new(primary: P, fallback: F, breaker_config: &CircuitBreakerConfig, retry: RetryPolicy) -> Self {
        let primary_breaker = Arc::new(CircuitBreaker::new(primary.name(), breaker_config.clone()));
        let fallback_guard = breaker_config.guard_fallback.then(|| {
            let breaker = Arc::new(CircuitBreaker::new(fallback.name(), breaker_config.clone()));
            GuardedCall::breaker_only(breaker)
        });

        tracing::info!(
            primary = primary.name(),
            fallback = fallback.name(),
            max_attempts = retry.max_attempts(),
            guard_fallback = fallback_guard.is_some(),
            "Provider client initialized"
        );

        Self {
            primary,
            fallback,
            primary_guard: GuardedCall::new(primary_breaker, retry),
            fallback_guard,
        }
    }

    /// Verify `number` (E.164). Never fails: total unavailability is `INDETERMINATE`.
    pub async fn verify(&self, number: &str) -> VerificationStatus {
        match self.primary_guard.execute(|| self.primary.verify(number)).await {
            Ok(status) => {
                metrics::record_primary_success(OP_VERIFY);
                return status;
            }
            Err(e) => self.note_primary_failure(OP_VERIFY, &e),
        }

        match self.call_fallback(|| self.fallback.verify(number)).await {
            Ok(status) => {
                tracing::info!(provider = self.fallback.name(), %status, "Fallback provider answered verification");
                status
            }
            Err(e) => {
                tracing::error!(
                    provider = self.fallback.name(),
                    error = %e,
                    "Fallback provider failed, verification is indeterminate"
                );
                VerificationStatus::Indeterminate
            }
        }
    }

    /// Phone number of the current subscriber, from whichever provider answers.
    pub async fn fetch_subscriber_number(&self) -> Result<String, VerificationError> {
        match self.primary_guard.execute(|| self.primary.fetch_subscriber_number()).await {
            Ok(number) => {
                metrics::record_primary_success(OP_FETCH_NUMBER);
                return Ok(number);
            }
            Err(e) => self.note_primary_failure(OP_FETCH_NUMBER, &e),
        }

        self.call_fallback(|| self.fallback.fetch_subscriber_number())
            .await
            .map_err(|e| {
                tracing::error!(
                    provider = self.fallback.name(),
                    error = %e,
                    "Fallback provider failed, subscriber number unavailable"
                );
                VerificationError::Unavailable
            })
    }

    /// Breaker state of every guarded provider, primary first.
    pub fn breaker_snapshots(&self) -> Vec<CircuitSnapshot> {
        std::iter::once(&self.primary_guard)
            .chain(self.fallback_guard.as_ref())
            .map(GuardedCall::snapshot)
            .collect()
    }

    fn note_primary_failure(&self, operation: &'static str, error: &CallError<ProviderError>) {
        metrics::record_primary_failure(operation);
        metrics::record_fallback_used(operation);
        match error {
            CallError::Rejected(e) => {
                tracing::warn!(provider = self.primary.name(), operation, reason = %e, "Primary provider skipped, using fallback")
            }
            CallError::Failed(e) => {
                tracing::warn!(provider = self.primary.name(), operation, error = %e, "Primary provider failed, using fallback")
            }
        }
    }

    async fn call_fallback<T, Op, Fut>(&self, mut op: Op) -> Result<T, CallError<ProviderError>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match &self.fallback_guard {
            Some(guard) => guard.execute(op).await,
            None => op().await.map_err(CallError::Failed),
        }
    }
}

/// Build the HTTP-backed client from service configuration.
pub fn build_provider_client(config: &ServiceConfig) -> ProviderResult<HttpProviderClient> {
    let primary = HttpTelecomProvider::from_config(&config.providers.primary)?;
    let fallback = HttpTelecomProvider::from_config(&config.providers.fallback)?;
    Ok(ProviderClient::new(
        primary,
        fallback,
        &config.circuit_breaker,
        RetryPolicy::from_config(&config.retries),
    ))
}
