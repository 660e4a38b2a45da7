//! Failure injection tests for the verification service.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

mod common;

const SUBSCRIBER: &str = "+15551234567";

fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

async fn verify(client: &reqwest::Client, url: &str, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.expect("service unreachable");
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_primary_answers_directly() {
    let primary = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let fallback = common::start_mock_provider("NO_MATCH", SUBSCRIBER).await;
    let service = common::start_service(common::service_config(primary.base_url(), fallback.base_url())).await;
    let client = common::http_client();

    let (status, body) = verify(
        &client,
        &service.url("/api/v1/verify"),
        json!({ "phoneNumber": SUBSCRIBER, "correlationId": "corr-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "MATCH");
    assert_eq!(body["correlationId"], "corr-42");
    assert!(body["verificationId"].is_string());
    assert_eq!(primary.hits(), 1);
    assert_eq!(fallback.hits(), 0);

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_primary_falls_back_after_retries() {
    let primary = common::closed_address().await;
    let fallback = common::start_mock_provider("NO_MATCH", SUBSCRIBER).await;
    let service = common::start_service(common::service_config(format!("http://{primary}"), fallback.base_url())).await;
    let client = common::http_client();

    let (status, body) = verify(&client, &service.url("/api/v1/verify"), json!({ "phoneNumber": SUBSCRIBER })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "NO_MATCH");
    assert_eq!(fallback.hits(), 1);

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_both_providers_down() {
    let primary = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let fallback = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    primary.set_healthy(false);
    fallback.set_healthy(false);
    let service = common::start_service(common::service_config(primary.base_url(), fallback.base_url())).await;
    let client = common::http_client();

    let (status, body) = verify(&client, &service.url("/api/v1/verify"), json!({ "phoneNumber": SUBSCRIBER })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "INDETERMINATE");

    let res = client.get(service.url("/api/v1/device-phone-number")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "PROVIDER_UNAVAILABLE");

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_hashed_number_compared_against_subscriber() {
    let primary = common::start_mock_provider("NO_MATCH", SUBSCRIBER).await;
    let fallback = common::start_mock_provider("NO_MATCH", SUBSCRIBER).await;
    let service = common::start_service(common::service_config(primary.base_url(), fallback.base_url())).await;
    let client = common::http_client();
    let url = service.url("/api/v1/verify");

    let (_, body) = verify(&client, &url, json!({ "hashedPhoneNumber": sha256_hex(SUBSCRIBER) })).await;
    assert_eq!(body["status"], "MATCH");

    let (_, body) = verify(&client, &url, json!({ "hashedPhoneNumber": sha256_hex("+15559876543") })).await;
    assert_eq!(body["status"], "NO_MATCH");

    let (status, body) = verify(&client, &url, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_circuit_opens_and_health_reports_it() {
    let primary = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let fallback = common::start_mock_provider("NO_MATCH", SUBSCRIBER).await;
    primary.set_healthy(false);
    let service = common::start_service(common::service_config(primary.base_url(), fallback.base_url())).await;
    let client = common::http_client();
    let url = service.url("/api/v1/verify");

    // HTTP 503 is not transient, so each request costs the primary one call.
    for _ in 0..5 {
        let (_, body) = verify(&client, &url, json!({ "phoneNumber": SUBSCRIBER })).await;
        assert_eq!(body["status"], "NO_MATCH");
    }
    assert_eq!(primary.hits(), 5);

    let health: Value = client.get(service.url("/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["circuit_breakers"][0]["name"], "primary");
    assert_eq!(health["circuit_breakers"][0]["state"], "OPEN");

    // Open breaker: the primary is skipped entirely.
    primary.set_healthy(true);
    let (_, body) = verify(&client, &url, json!({ "phoneNumber": SUBSCRIBER })).await;
    assert_eq!(body["status"], "NO_MATCH");
    assert_eq!(primary.hits(), 5);
    assert_eq!(fallback.hits(), 6);

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_per_api_key() {
    let primary = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let fallback = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let mut config = common::service_config(primary.base_url(), fallback.base_url());
    config.rate_limit.requests_per_window = 3;
    let service = common::start_service(config).await;
    let client = common::http_client();
    let url = service.url("/api/v1/device-phone-number");

    for _ in 0..3 {
        let res = client.get(&url).header("x-api-key", "tenant-a").send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client.get(&url).header("x-api-key", "tenant-a").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");

    let res = client.get(&url).header("x-api-key", "tenant-b").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["phoneNumber"], SUBSCRIBER);

    service.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let primary = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let fallback = common::start_mock_provider("MATCH", SUBSCRIBER).await;
    let service = common::start_service(common::service_config(primary.base_url(), fallback.base_url())).await;

    service.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), service.handle)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}
