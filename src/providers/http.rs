//! Telecom provider reached over HTTP/JSON.
//!
//! # Wire contract
//! ```text
//! POST {base_url}/verify               {"phoneNumber": "+1555..."} → {"status": "MATCH"}
//! GET  {base_url}/device-phone-number                              → {"phoneNumber": "+1555..."}
//! ```
//! The provider key travels in `X-API-Key`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProviderEndpointConfig;
use crate::providers::types::{ProviderError, ProviderResult, TelecomProvider, VerificationStatus};
use crate::resilience::timeouts::with_deadline;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody<'a> {
    phone_number: &'a str,
}

#[derive(Deserialize)]
struct VerifyReply {
    status: VerificationStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NumberReply {
    phone_number: String,
}

/// HTTP client for one upstream provider.
#[derive(Clone)]
pub struct HttpTelecomProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTelecomProvider {
    /// Build a provider client from its endpoint configuration.
    pub fn from_config(config: &ProviderEndpointConfig) -> ProviderResult<Self> {
        let parsed = url::Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Config(format!("invalid base URL '{}': {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!(provider = %config.name, "No API key configured for provider");
        }

        Ok(Self {
            name: config.name.clone(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            api_key,
            timeout: config.timeout(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ProviderResult<T> {
        with_deadline(self.timeout, async {
            let response = self.authorize(request).send().await.map_err(map_transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status(status.as_u16()));
            }
            response.json::<T>().await.map_err(map_transport)
        })
        .await
    }
}

fn map_transport(e: reqwest::Error) -> ProviderError {
    if e.is_decode() {
        ProviderError::InvalidResponse(e.to_string())
    } else {
        ProviderError::Connection(e.to_string())
    }
}

impl TelecomProvider for HttpTelecomProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self, number: &str) -> ProviderResult<VerificationStatus> {
        tracing::debug!(provider = %self.name, "Verifying phone number with provider");
        let request = self
            .client
            .post(self.endpoint("verify"))
            .json(&VerifyBody { phone_number: number });
        let reply: VerifyReply = self.send(request).await?;
        Ok(reply.status)
    }

    async fn fetch_subscriber_number(&self) -> ProviderResult<String> {
        tracing::debug!(provider = %self.name, "Retrieving subscriber number from provider");
        let request = self.client.get(self.endpoint("device-phone-number"));
        let reply: NumberReply = self.send(request).await?;
        if reply.phone_number.is_empty() {
            return Err(ProviderError::InvalidResponse("empty phone number".to_string()));
        }
        Ok(reply.phone_number)
    }
}

impl std::fmt::Debug for HttpTelecomProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTelecomProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn endpoint(base_url: &str) -> ProviderEndpointConfig {
        ProviderEndpointConfig {
            name: "primary".into(),
            base_url: base_url.into(),
            api_key: Some("test-key".into()),
            api_key_env: None,
            timeout_ms: 500,
        }
    }

    /// Consume request headers and body so closing the socket does not reset it.
    async fn drain_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_ascii_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Serve one canned HTTP response per connection, forever.
    async fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    drain_request(&mut socket).await;
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let provider = HttpTelecomProvider::from_config(&endpoint("http://telco.example/api/")).unwrap();
        assert_eq!(provider.endpoint("verify"), "http://telco.example/api/verify");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpTelecomProvider::from_config(&endpoint("not a url")).unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[tokio::test]
    async fn test_verify_parses_status() {
        let base = serve("200 OK", r#"{"status":"NO_MATCH"}"#).await;
        let provider = HttpTelecomProvider::from_config(&endpoint(&base)).unwrap();
        assert_eq!(provider.verify("+15551234567").await, Ok(VerificationStatus::NoMatch));
    }

    #[tokio::test]
    async fn test_fetch_number() {
        let base = serve("200 OK", r#"{"phoneNumber":"+15551234567"}"#).await;
        let provider = HttpTelecomProvider::from_config(&endpoint(&base)).unwrap();
        assert_eq!(provider.fetch_subscriber_number().await.unwrap(), "+15551234567");
    }

    #[tokio::test]
    async fn test_server_error_is_status() {
        let base = serve("503 Service Unavailable", "{}").await;
        let provider = HttpTelecomProvider::from_config(&endpoint(&base)).unwrap();
        assert_eq!(provider.verify("+15551234567").await, Err(ProviderError::Status(503)));
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid_response() {
        let base = serve("200 OK", r#"{"status":"MAYBE"}"#).await;
        let provider = HttpTelecomProvider::from_config(&endpoint(&base)).unwrap();
        assert!(matches!(
            provider.verify("+15551234567").await,
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = HttpTelecomProvider::from_config(&endpoint(&format!("http://{addr}"))).unwrap();
        let err = provider.verify("+15551234567").await.unwrap_err();
        assert!(matches!(err, ProviderError::Connection(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without answering.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = HttpTelecomProvider::from_config(&endpoint(&format!("http://{addr}"))).unwrap();
        let err = provider.fetch_subscriber_number().await.unwrap_err();
        assert_eq!(err, ProviderError::Timeout(Duration::from_millis(500)));
    }
}
