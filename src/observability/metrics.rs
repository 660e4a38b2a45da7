//! Metrics collection and exposition.
//!
//! # Metrics
//! - `provider.primary.success` (counter): primary calls that produced an answer
//! - `provider.primary.failure` (counter): primary calls that failed or were rejected
//! - `provider.fallback.used` (counter): fallback invocations, by operation
//! - `rate_limit.rejected` (counter): requests denied admission
//! - `circuit_breaker.opened` (counter): breaker transitions to OPEN, by provider
//! - `verification.result` (counter): final statuses, by status
//! - `api.request.duration` (histogram): ingress latency, by operation
//!
//! The Prometheus exporter rewrites dots to underscores on exposition.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const PRIMARY_SUCCESS: &str = "provider.primary.success";
pub const PRIMARY_FAILURE: &str = "provider.primary.failure";
pub const FALLBACK_USED: &str = "provider.fallback.used";
pub const RATE_LIMIT_REJECTED: &str = "rate_limit.rejected";
pub const CIRCUIT_BREAKER_OPENED: &str = "circuit_breaker.opened";
pub const VERIFICATION_RESULT: &str = "verification.result";
pub const REQUEST_DURATION: &str = "api.request.duration";

/// Install the Prometheus recorder with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_primary_success(operation: &'static str) {
    counter!(PRIMARY_SUCCESS, "operation" => operation).increment(1);
}

pub fn record_primary_failure(operation: &'static str) {
    counter!(PRIMARY_FAILURE, "operation" => operation).increment(1);
}

pub fn record_fallback_used(operation: &'static str) {
    counter!(FALLBACK_USED, "operation" => operation).increment(1);
}

pub fn record_rate_limited() {
    counter!(RATE_LIMIT_REJECTED).increment(1);
}

pub fn record_circuit_opened(provider: &str) {
    counter!(CIRCUIT_BREAKER_OPENED, "provider" => provider.to_string()).increment(1);
}

pub fn record_verification(status: &'static str) {
    counter!(VERIFICATION_RESULT, "status" => status).increment(1);
}

pub fn record_request_duration(operation: &'static str, start: Instant) {
    histogram!(REQUEST_DURATION, "operation" => operation).record(start.elapsed().as_secs_f64());
}
