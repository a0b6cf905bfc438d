//! Gateway service: shared state, router assembly and the HTTP server loop.

use crate::domain::config::{GatewayConfig, WebSocketConfig};
use crate::domain::error::GatewayError;
use crate::middleware::{
    create_cors_layer, GatewayMetrics, MetricsLayer, RateLimitLayer, TokenVerifier, TracingLayer,
};
use crate::routes::api_router;
use crate::ws::{notification_socket, NotificationHub};
use axum::extract::{FromRef, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use stackit_forum::ForumService;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub forum: Arc<ForumService>,
    pub hub: Arc<NotificationHub>,
    pub verifier: Arc<TokenVerifier>,
    pub metrics: Arc<GatewayMetrics>,
    pub websocket: WebSocketConfig,
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.verifier)
    }
}

/// The HTTP/WebSocket front of the forum.
pub struct ApiGatewayService {
    config: GatewayConfig,
    state: AppState,
    rate_limit: RateLimitLayer,
}

impl ApiGatewayService {
    /// Wire a gateway around `forum`. The hub must be the same one the
    /// forum publishes notifications to.
    pub fn new(
        config: GatewayConfig,
        forum: Arc<ForumService>,
        hub: Arc<NotificationHub>,
        metrics: Arc<GatewayMetrics>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let state = AppState {
            forum,
            hub,
            verifier: Arc::new(TokenVerifier::new(&config.auth.jwt_secret)),
            metrics: Arc::clone(&metrics),
            websocket: config.websocket.clone(),
        };
        let rate_limit = RateLimitLayer::new(config.rate_limit.clone(), metrics);

        Ok(Self {
            config,
            state,
            rate_limit,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Full router with the middleware stack applied.
    ///
    /// tower-http layers are applied one `Router::layer` call at a time so
    /// each sees plain `Request<Body>`/`Response` types.
    pub fn router(&self) -> Router {
        let observed = ServiceBuilder::new()
            .layer(TracingLayer::new())
            .layer(MetricsLayer::new(Arc::clone(&self.state.metrics)))
            .layer(self.rate_limit.clone());

        Router::new()
            .nest("/api", api_router())
            .route("/ws", get(notification_socket))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_request_size))
            .layer(TimeoutLayer::new(self.config.timeouts.request))
            .layer(observed)
            .layer(create_cors_layer(&self.config.cors))
            .with_state(self.state.clone())
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        let router = self.router();

        let sweeper = tokio::spawn(crate::middleware::rate_limit::cleanup_task(
            self.rate_limit.state(),
            Duration::from_secs(60),
            self.config.rate_limit.bucket_idle,
        ));

        info!(addr = %local, "StackIt gateway listening");
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()));

        sweeper.abort();
        info!("StackIt gateway stopped");
        result
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}
