//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URLs.
//! All problems are reported at once rather than stopping at the first.

use crate::config::schema::{ProviderEndpointConfig, ServiceConfig};
use thiserror::Error;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    validate_provider("providers.primary", &config.providers.primary, &mut errors);
    validate_provider("providers.fallback", &config.providers.fallback, &mut errors);

    let rl = &config.rate_limit;
    if rl.requests_per_window == 0 {
        errors.push(ValidationError::new("rate_limit.requests_per_window", "must be at least 1"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be at least 1"));
    }
    if rl.max_clients == 0 {
        errors.push(ValidationError::new("rate_limit.max_clients", "must be at least 1"));
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be at least 1"));
    }

    let cb = &config.circuit_breaker;
    if !(cb.failure_threshold > 0.0 && cb.failure_threshold <= 1.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            format!("{} is outside (0, 1]", cb.failure_threshold),
        ));
    }
    if cb.window_size == 0 {
        errors.push(ValidationError::new("circuit_breaker.window_size", "must be at least 1"));
    }
    if cb.minimum_calls == 0 || cb.minimum_calls > cb.window_size {
        errors.push(ValidationError::new(
            "circuit_breaker.minimum_calls",
            format!("must be between 1 and window_size ({})", cb.window_size),
        ));
    }
    if cb.permitted_half_open_calls == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.permitted_half_open_calls",
            "must be at least 1",
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_wait_ms < config.retries.wait_ms {
        errors.push(ValidationError::new("retries.max_wait_ms", "must not be below wait_ms"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_provider(prefix: &str, provider: &ProviderEndpointConfig, errors: &mut Vec<ValidationError>) {
    match url::Url::parse(&provider.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            format!("{prefix}.base_url"),
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            format!("{prefix}.base_url"),
            format!("'{}' is not a valid URL: {e}", provider.base_url),
        )),
    }
    if provider.timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.timeout_ms"), "must be greater than 0"));
    }
}
