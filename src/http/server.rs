//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, limits, security headers)
//! - Bind server to listener
//! - Apply configuration reloads to the live snapshot
//! - Dispatch relay calls into the forwarding pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, Request},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cipher::CipherContext;
use crate::config::RelayConfig;
use crate::dispatch::ReqwestTransport;
use crate::error::{RelayError, RelayResult};
use crate::http::request::{request_id, toggle_enabled, RelayRequest, RelayRequestId};
use crate::http::response::HealthResponse;
use crate::model::ResponseEnvelope;
use crate::observability::metrics;
use crate::relay::Relay;
use crate::security::{apply_body_limit, apply_security_headers};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<RelayConfig>>,
    pub relay: Arc<Relay>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ArcSwap<RelayConfig>>,
}

impl HttpServer {
    /// Create a server forwarding over a real HTTP client.
    pub fn new(config: RelayConfig, cipher: Arc<CipherContext>) -> RelayResult<Self> {
        let transport =
            ReqwestTransport::new(Duration::from_secs(config.timeouts.connect_secs))
                .map_err(|e| RelayError::Unexpected(e.to_string()))?;
        let relay = Relay::new(Arc::new(transport), cipher);
        Ok(Self::with_relay(config, relay))
    }

    /// Create a server around an existing pipeline.
    pub fn with_relay(config: RelayConfig, relay: Relay) -> Self {
        let router_config = config.clone();
        let config = Arc::new(ArcSwap::from_pointee(config));
        let state = AppState {
            config: config.clone(),
            relay: Arc::new(relay),
        };

        let router = Self::build_router(&router_config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer settings are taken from the startup configuration; a reload
    /// only changes per-call defaults.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/mock/request", post(relay_handler))
            .route("/health", get(health_handler))
            .with_state(state);

        let router = apply_body_limit(router, config.security.max_body_size);
        let router = if config.security.enable_headers {
            apply_security_headers(router)
        } else {
            router
        };

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(RelayRequestId))
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live = self.config.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    max_retries = new_config.retries.max_retries,
                    backoff_factor = new_config.retries.backoff_factor,
                    upstream_secs = new_config.timeouts.upstream_secs,
                    "Applying reloaded configuration"
                );
                live.store(Arc::new(new_config));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward one call through the pipeline.
async fn relay_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<ResponseEnvelope>, RelayError> {
    let start_time = Instant::now();
    let config = state.config.load_full();

    let resolved = payload
        .map_err(|rejection| RelayError::Validation(rejection.body_text()))
        .and_then(|Json(request)| {
            request.resolve(&config, toggle_enabled(&headers, &config.cipher.toggle_header))
        });
    let (spec, options) = match resolved {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(error = %err, "Rejected relay call");
            metrics::record_request("invalid", err.status_code(), start_time);
            return Err(err);
        }
    };

    let method = spec.method();
    tracing::debug!(method = %method, encrypt = options.encrypt, "Relaying call");

    let result = state.relay.execute(spec, &options).await;
    let status = match &result {
        Ok(envelope) => envelope.status_code(),
        Err(err) => err.status_code(),
    };
    metrics::record_request(method.as_str(), status, start_time);

    result.map(Json)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
