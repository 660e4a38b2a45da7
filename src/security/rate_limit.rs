//! Per-client token-bucket rate limiting.
//!
//! Each client key (`api-key:<key>` or `ip:<addr>`) owns a bucket holding up to
//! `requests_per_window` tokens, refilled continuously at
//! `requests_per_window / window_secs` tokens per second.
//!
//! The bucket map is bounded: idle buckets are swept periodically, and a full
//! map evicts a batch of its least recently used buckets before admitting a
//! new key.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::verification::VerificationError;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_rate_per_second: f64,
    last_refill_at: Instant,
}

impl Bucket {
    fn full(capacity: f64, refill_rate_per_second: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate_per_second,
            last_refill_at: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate_per_second).min(self.capacity);
        self.last_refill_at = now;
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared admission control for all inbound requests.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    capacity: f64,
    refill_rate_per_second: f64,
    idle_ttl: Duration,
    max_clients: usize,
    /// Buckets freed at once when the map is full.
    eviction_batch: usize,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.requests_per_window.max(1));
        let window = config.window_secs.max(1) as f64;
        let max_clients = config.max_clients.max(1);
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_rate_per_second: capacity / window,
            idle_ttl: Duration::from_secs(config.idle_eviction_secs),
            max_clients,
            eviction_batch: (max_clients / 10).max(1),
        }
    }

    /// Take one token for `client_key`. Returns false when the bucket is empty.
    ///
    /// Refill and consumption happen under the bucket's shard lock, so
    /// concurrent requests for one key never both spend the same token.
    pub fn admit(&self, client_key: &str) -> bool {
        let now = Instant::now();
        if let Some(mut bucket) = self.buckets.get_mut(client_key) {
            return bucket.try_acquire(now);
        }

        if self.buckets.len() >= self.max_clients {
            self.make_room(now);
        }

        let mut bucket = self
            .buckets
            .entry(client_key.to_string())
            .or_insert_with(|| Bucket::full(self.capacity, self.refill_rate_per_second, now));
        bucket.try_acquire(now)
    }

    /// Drop buckets idle for longer than the configured TTL.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    fn sweep_idle_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_duration_since(bucket.last_refill_at) < self.idle_ttl;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Shrink a full map to `max_clients - eviction_batch`: idle buckets
    /// first, then the least recently used ones. The full-map pass then runs
    /// once per batch of new keys rather than once per key.
    fn make_room(&self, now: Instant) {
        self.sweep_idle_at(now);
        let low_water = self.max_clients - self.eviction_batch;
        let excess = self.buckets.len().saturating_sub(low_water);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(Instant, String)> = self
            .buckets
            .iter()
            .map(|entry| (entry.value().last_refill_at, entry.key().clone()))
            .collect();
        if excess < by_age.len() {
            by_age.select_nth_unstable_by_key(excess, |(last_used, _)| *last_used);
        }
        for (_, key) in by_age.into_iter().take(excess) {
            self.buckets.remove(&key);
        }
        tracing::debug!(
            evicted = excess,
            remaining = self.buckets.len(),
            "Evicted least recently used rate limit buckets"
        );
    }

    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

/// Periodically sweep idle buckets until shutdown.
pub async fn run_sweeper(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep_idle();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = limiter.tracked_clients(),
                        "Swept idle rate limit buckets"
                    );
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

/// Rate limit key: API key when present, else peer address.
pub fn client_key(request: &Request<Body>) -> String {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    if let Some(key) = api_key {
        return format!("api-key:{key}");
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

/// Middleware rejecting requests whose client bucket is empty.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if limiter.admit(&key) {
        next.run(request).await
    } else {
        let kind = key.split(':').next().unwrap_or("unknown");
        tracing::warn!(client_kind = kind, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        VerificationError::RateLimited.into_response()
    }
}
