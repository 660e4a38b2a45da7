//! Final verification outcome for a request.
//!
//! A plain candidate number is verified by the providers. A hashed candidate
//! is compared locally against the SHA-256 of the subscriber number the
//! providers report, so the plain number never leaves the caller.

use serde::{Deserialize, Serialize};

use crate::observability::logging::mask_phone_number;
use crate::observability::metrics;
use crate::providers::{TelecomProvider, VerificationStatus};
use crate::verification::client::ProviderClient;
use crate::verification::error::VerificationError;
use crate::verification::phone::{normalize_e164, normalize_hash, sha256_hex};

/// Inbound verification request. Exactly one candidate is expected; when both
/// are given the plain number is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve `request` to a verification status using `client`.
pub async fn resolve<P, F>(
    request: &VerificationRequest,
    client: &ProviderClient<P, F>,
) -> Result<VerificationStatus, VerificationError>
where
    P: TelecomProvider,
    F: TelecomProvider,
{
    let status = match (present(&request.phone_number), present(&request.hashed_phone_number)) {
        (Some(number), _) => {
            let number = normalize_e164(number)?;
            tracing::debug!(phone = %mask_phone_number(&number), "Resolving plain phone number");
            client.verify(&number).await
        }
        (None, Some(hash)) => {
            let hash = normalize_hash(hash)?;
            tracing::debug!("Resolving hashed phone number");
            match client.fetch_subscriber_number().await {
                Ok(subscriber) if sha256_hex(&subscriber) == hash => VerificationStatus::Match,
                Ok(_) => VerificationStatus::NoMatch,
                Err(VerificationError::Unavailable) => VerificationStatus::Indeterminate,
                Err(e) => return Err(e),
            }
        }
        (None, None) => {
            return Err(VerificationError::InvalidInput(
                "either phoneNumber or hashedPhoneNumber is required".to_string(),
            ))
        }
    };

    metrics::record_verification(status.as_str());
    tracing::info!(
        %status,
        correlation_id = request.correlation_id.as_deref().unwrap_or(""),
        "Verification resolved"
    );
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::verification::client::tests::{client, MockProvider};

    const SUBSCRIBER: &str = "+15551234567";

    fn hashed(hash: String) -> VerificationRequest {
        VerificationRequest {
            hashed_phone_number: Some(hash),
            ..VerificationRequest::default()
        }
    }

    fn healthy_client(status: VerificationStatus) -> ProviderClient<MockProvider, MockProvider> {
        client(
            MockProvider::healthy("primary", status, SUBSCRIBER),
            MockProvider::healthy("fallback", status, SUBSCRIBER),
        )
    }

    #[tokio::test]
    async fn test_plain_number_is_verified() {
        let request = VerificationRequest {
            phone_number: Some("15551234567".into()),
            ..VerificationRequest::default()
        };
        let status = resolve(&request, &healthy_client(VerificationStatus::Match)).await;
        assert_eq!(status, Ok(VerificationStatus::Match));
    }

    #[tokio::test]
    async fn test_hash_of_subscriber_matches() {
        let request = hashed(sha256_hex(SUBSCRIBER));
        let status = resolve(&request, &healthy_client(VerificationStatus::NoMatch)).await;
        assert_eq!(status, Ok(VerificationStatus::Match));
    }

    #[tokio::test]
    async fn test_hash_is_case_insensitive() {
        let request = hashed(sha256_hex(SUBSCRIBER).to_uppercase());
        let status = resolve(&request, &healthy_client(VerificationStatus::NoMatch)).await;
        assert_eq!(status, Ok(VerificationStatus::Match));
    }

    #[tokio::test]
    async fn test_hash_of_other_number_does_not_match() {
        let request = hashed(sha256_hex("+15559876543"));
        let status = resolve(&request, &healthy_client(VerificationStatus::Match)).await;
        assert_eq!(status, Ok(VerificationStatus::NoMatch));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hash_without_subscriber_number_is_indeterminate() {
        let client = client(
            MockProvider::failing("primary", ProviderError::Status(503)),
            MockProvider::failing("fallback", ProviderError::Status(503)),
        );
        let status = resolve(&hashed(sha256_hex(SUBSCRIBER)), &client).await;
        assert_eq!(status, Ok(VerificationStatus::Indeterminate));
    }

    #[tokio::test]
    async fn test_missing_candidates_are_invalid() {
        let client = healthy_client(VerificationStatus::Match);
        let empty = VerificationRequest {
            phone_number: Some("  ".into()),
            hashed_phone_number: Some(String::new()),
            correlation_id: None,
        };
        for request in [VerificationRequest::default(), empty] {
            assert!(matches!(
                resolve(&request, &client).await,
                Err(VerificationError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_malformed_inputs_are_invalid() {
        let client = healthy_client(VerificationStatus::Match);
        let bad_number = VerificationRequest {
            phone_number: Some("+0123".into()),
            ..VerificationRequest::default()
        };
        assert!(resolve(&bad_number, &client).await.is_err());
        assert!(resolve(&hashed("deadbeef".into()), &client).await.is_err());
    }

    #[tokio::test]
    async fn test_plain_number_wins_over_hash() {
        let request = VerificationRequest {
            phone_number: Some(SUBSCRIBER.into()),
            hashed_phone_number: Some(sha256_hex(SUBSCRIBER)),
            correlation_id: Some("corr-1".into()),
        };
        let status = resolve(&request, &healthy_client(VerificationStatus::NoMatch)).await;
        assert_eq!(status, Ok(VerificationStatus::NoMatch));
    }

    #[test]
    fn test_request_wire_format() {
        let request: VerificationRequest =
            serde_json::from_str(r#"{"phoneNumber":"+15551234567","correlationId":"abc"}"#).unwrap();
        assert_eq!(request.phone_number.as_deref(), Some("+15551234567"));
        assert_eq!(request.hashed_phone_number, None);
        assert_eq!(request.correlation_id.as_deref(), Some("abc"));
    }
}
