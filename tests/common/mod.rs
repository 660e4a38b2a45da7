//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use number_verification::config::{ProviderEndpointConfig, ServiceConfig};
use number_verification::verification::build_provider_client;
use number_verification::{HttpServer, Shutdown};

/// Handle on a mock telecom provider.
pub struct MockProvider {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    healthy: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Healthy providers answer normally; unhealthy ones answer 503.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

/// Start a mock provider answering `/verify` with `status` and
/// `/device-phone-number` with `phone_number`.
pub async fn start_mock_provider(status: &'static str, phone_number: &'static str) -> MockProvider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(true));

    let (h, ok) = (hits.clone(), healthy.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let (h, ok) = (h.clone(), ok.clone());
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                h.fetch_add(1, Ordering::SeqCst);

                let (status_line, body) = if !ok.load(Ordering::SeqCst) {
                    ("503 Service Unavailable", r#"{"error":"down"}"#.to_string())
                } else if path.ends_with("/verify") {
                    ("200 OK", format!(r#"{{"status":"{status}"}}"#))
                } else if path.ends_with("/device-phone-number") {
                    ("200 OK", format!(r#"{{"phoneNumber":"{phone_number}"}}"#))
                } else {
                    ("404 Not Found", "{}".to_string())
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockProvider { addr, hits, healthy }
}

/// Read one HTTP/1.1 request, headers and `Content-Length` body, as text.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn endpoint(name: &str, base_url: String) -> ProviderEndpointConfig {
    ProviderEndpointConfig {
        name: name.to_string(),
        base_url,
        api_key: Some(format!("{name}-key")),
        api_key_env: None,
        timeout_ms: 1000,
    }
}

/// Config pointing at the given providers, with short retry waits.
pub fn service_config(primary: String, fallback: String) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.providers.primary = endpoint("primary", primary);
    config.providers.fallback = endpoint("fallback", fallback);
    config.retries.wait_ms = 10;
    config
}

/// A running service. Dropping it shuts the server down.
pub struct RunningService {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl RunningService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_service(config: ServiceConfig) -> RunningService {
    let client = Arc::new(build_provider_client(&config).unwrap());
    let server = HttpServer::new(config, client);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    RunningService {
        addr,
        shutdown,
        handle,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
