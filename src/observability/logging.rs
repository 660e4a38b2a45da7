//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default filter directive for a configured level.
fn default_directive(level: &str) -> String {
    format!("number_verification={level},tower_http={level}")
}

/// Install the global tracing subscriber.
///
/// Returns an error if a global subscriber was already set.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}

/// Mask a phone number for logs: `+15551234567` becomes `+15*****4567`.
pub fn mask_phone_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() < 8 {
        return "INVALID_NUMBER".to_string();
    }
    let visible = 4;
    let prefix = 3.min(chars.len() - visible);
    let mut masked: String = chars[..prefix].iter().collect();
    masked.extend(std::iter::repeat('*').take(chars.len() - prefix - visible));
    masked.extend(&chars[chars.len() - visible..]);
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("+15551234567"), "+15*****4567");
        assert_eq!(mask_phone_number("12345678"), "123*5678");
        assert_eq!(mask_phone_number("+1234"), "INVALID_NUMBER");
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("debug"),
            "number_verification=debug,tower_http=debug"
        );
    }
}
