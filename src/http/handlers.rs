//! Request handlers for the verification API.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;
use uuid::Uuid;

use crate::http::response::{now_millis, HealthResponse, PhoneNumberResponse, VerificationResponse};
use crate::http::server::AppState;
use crate::observability::logging::mask_phone_number;
use crate::observability::metrics;
use crate::providers::TelecomProvider;
use crate::resilience::CircuitState;
use crate::verification::{resolve, VerificationError, VerificationRequest};

pub async fn verify<P, F>(
    State(state): State<AppState<P, F>>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> Response
where
    P: TelecomProvider + 'static,
    F: TelecomProvider + 'static,
{
    let start = Instant::now();
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected malformed verification request");
            return VerificationError::InvalidInput(rejection.body_text()).into_response();
        }
    };

    let response = match resolve(&request, &state.client).await {
        Ok(status) => {
            let body = VerificationResponse {
                verification_id: Uuid::new_v4().to_string(),
                status,
                verified_at_ms: now_millis(),
                correlation_id: request.correlation_id,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "Verification request failed");
            e.into_response()
        }
    };

    metrics::record_request_duration("verify", start);
    response
}

pub async fn device_phone_number<P, F>(State(state): State<AppState<P, F>>) -> Response
where
    P: TelecomProvider + 'static,
    F: TelecomProvider + 'static,
{
    let start = Instant::now();
    let response = match state.client.fetch_subscriber_number().await {
        Ok(phone_number) => {
            tracing::info!(phone = %mask_phone_number(&phone_number), "Subscriber number retrieved");
            let body = PhoneNumberResponse {
                phone_number,
                retrieved_at_ms: now_millis(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    };

    metrics::record_request_duration("device_phone_number", start);
    response
}

/// Liveness plus breaker states. Reports `degraded` while any breaker is not closed.
pub async fn health<P, F>(State(state): State<AppState<P, F>>) -> Json<HealthResponse>
where
    P: TelecomProvider + 'static,
    F: TelecomProvider + 'static,
{
    let circuit_breakers = state.client.breaker_snapshots();
    let status = if circuit_breakers.iter().all(|b| b.state == CircuitState::Closed) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        circuit_breakers,
    })
}
