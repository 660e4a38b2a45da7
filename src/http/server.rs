//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the verification API and health endpoint
//! - Wire up middleware (rate limiting, request ID, timeout, tracing)
//! - Run the bucket sweeper alongside the server
//! - Serve until the shutdown signal fires

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::providers::TelecomProvider;
use crate::security::rate_limit::{rate_limit_middleware, run_sweeper, RateLimiter};
use crate::verification::ProviderClient;

/// Application state injected into handlers.
pub struct AppState<P, F> {
    pub client: Arc<ProviderClient<P, F>>,
}

impl<P, F> Clone for AppState<P, F> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

/// HTTP server for the verification service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server around a provider client.
    pub fn new<P, F>(config: ServiceConfig, client: Arc<ProviderClient<P, F>>) -> Self
    where
        P: TelecomProvider + 'static,
        F: TelecomProvider + 'static,
    {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let router = Self::build_router(&config, AppState { client }, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<P, F>(config: &ServiceConfig, state: AppState<P, F>, limiter: Arc<RateLimiter>) -> Router
    where
        P: TelecomProvider + 'static,
        F: TelecomProvider + 'static,
    {
        let mut api = Router::new()
            .route("/verify", post(handlers::verify::<P, F>))
            .route("/device-phone-number", get(handlers::device_phone_number::<P, F>));
        if config.rate_limit.enabled {
            api = api.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        Router::new()
            .nest("/api/v1", api)
            .route("/health", get(handlers::health::<P, F>))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = if self.config.rate_limit.enabled {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1));
            Some(tokio::spawn(run_sweeper(self.limiter.clone(), interval, shutdown.resubscribe())))
        } else {
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(handle) = sweeper {
            let _ = handle.await;
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
