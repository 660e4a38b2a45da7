//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the number verification service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ingress timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream telecom providers.
    pub providers: ProvidersConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Primary and fallback provider endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub primary: ProviderEndpointConfig,
    pub fallback: ProviderEndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderEndpointConfig {
                name: "primary".to_string(),
                base_url: "http://localhost:9101".to_string(),
                ..ProviderEndpointConfig::default()
            },
            fallback: ProviderEndpointConfig {
                name: "fallback".to_string(),
                base_url: "http://localhost:9102".to_string(),
                ..ProviderEndpointConfig::default()
            },
        }
    }
}

/// A single upstream telecom provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderEndpointConfig {
    /// Provider identifier for logging/metrics.
    pub name: String,

    /// Base URL of the provider API (e.g., "https://api.telco.example").
    pub base_url: String,

    /// API key sent as `X-API-Key`. Prefer `api_key_env` outside development.
    pub api_key: Option<String>,

    /// Name of an environment variable holding the API key.
    pub api_key_env: Option<String>,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProviderEndpointConfig {
    fn default() -> Self {
        Self {
            name: "provider".to_string(),
            base_url: "http://localhost:9100".to_string(),
            api_key: None,
            api_key_env: None,
            timeout_ms: 2000,
        }
    }
}

impl ProviderEndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve the API key, environment variable first.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .or_else(|| self.api_key.clone())
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Bucket capacity: requests allowed per window, also the burst size.
    pub requests_per_window: u32,

    /// Window length in seconds; refill rate is capacity / window.
    pub window_secs: u64,

    /// Buckets untouched for this long are evicted.
    pub idle_eviction_secs: u64,

    /// Upper bound on tracked client keys.
    pub max_clients: usize,

    /// Interval of the background idle sweep.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 60,
            window_secs: 60,
            idle_eviction_secs: 600,
            max_clients: 100_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Circuit breaker configuration, applied to each guarded provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure fraction (0, 1] that trips the breaker.
    pub failure_threshold: f64,

    /// Number of most recent outcomes considered.
    pub window_size: usize,

    /// Outcomes required in the window before the rate is evaluated.
    pub minimum_calls: usize,

    /// Time spent open before trial calls are let through, in seconds.
    pub wait_duration_secs: u64,

    /// Trial calls allowed while half-open.
    pub permitted_half_open_calls: u32,

    /// Put the fallback provider behind its own breaker.
    pub guard_fallback: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            window_size: 10,
            minimum_calls: 5,
            wait_duration_secs: 30,
            permitted_half_open_calls: 3,
            guard_fallback: false,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait_duration_secs)
    }
}

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Constant `wait_ms` between attempts.
    #[default]
    Fixed,
    /// `wait_ms` doubling per attempt, capped at `max_wait_ms`, with jitter.
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Wait between attempts in milliseconds.
    pub wait_ms: u64,

    /// Delay strategy.
    pub backoff: BackoffStrategy,

    /// Cap for exponential backoff in milliseconds.
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_ms: 500,
            backoff: BackoffStrategy::Fixed,
            max_wait_ms: 5000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
