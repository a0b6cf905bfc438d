//! Request and socket counters, served at `/metrics`.

use axum::{body::Body, http::Request, response::Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Gateway metrics
#[derive(Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_client_error: AtomicU64,
    pub requests_server_error: AtomicU64,
    pub write_requests_total: AtomicU64,

    pub rate_limit_rejected: AtomicU64,

    // WebSocket counters
    pub websocket_connections: AtomicU64,
    pub websocket_messages_sent: AtomicU64,
    pub notifications_published: AtomicU64,

    pub total_latency_ms: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request by its response status.
    pub fn record_request(&self, status: u16, is_write: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let bucket = match status {
            500.. => &self.requests_server_error,
            400.. => &self.requests_client_error,
            _ => &self.requests_success,
        };
        bucket.fetch_add(1, Ordering::Relaxed);

        if is_write {
            self.write_requests_total.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ws_connect(&self) {
        self.websocket_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ws_disconnect(&self) {
        self.websocket_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_ws_message(&self) {
        self.websocket_messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.requests_total.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let counters = [
            (
                "stackit_requests_total",
                "Total HTTP requests",
                "counter",
                self.requests_total.load(Ordering::Relaxed),
            ),
            (
                "stackit_requests_success_total",
                "Requests answered below 400",
                "counter",
                self.requests_success.load(Ordering::Relaxed),
            ),
            (
                "stackit_requests_client_error_total",
                "Requests answered with 4xx",
                "counter",
                self.requests_client_error.load(Ordering::Relaxed),
            ),
            (
                "stackit_requests_server_error_total",
                "Requests answered with 5xx",
                "counter",
                self.requests_server_error.load(Ordering::Relaxed),
            ),
            (
                "stackit_write_requests_total",
                "Non-GET requests",
                "counter",
                self.write_requests_total.load(Ordering::Relaxed),
            ),
            (
                "stackit_rate_limit_rejected_total",
                "Rate limited requests",
                "counter",
                self.rate_limit_rejected.load(Ordering::Relaxed),
            ),
            (
                "stackit_websocket_connections",
                "Open notification sockets",
                "gauge",
                self.websocket_connections.load(Ordering::Relaxed),
            ),
            (
                "stackit_websocket_messages_sent_total",
                "Notifications pushed over sockets",
                "counter",
                self.websocket_messages_sent.load(Ordering::Relaxed),
            ),
            (
                "stackit_notifications_published_total",
                "Notifications handed to the hub",
                "counter",
                self.notifications_published.load(Ordering::Relaxed),
            ),
        ];

        let mut output = String::new();
        for (name, help, kind, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"
            ));
        }
        output.push_str(&format!(
            "# HELP stackit_average_latency_ms Average request latency\n\
             # TYPE stackit_average_latency_ms gauge\n\
             stackit_average_latency_ms {:.2}\n",
            self.average_latency_ms()
        ));
        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "client_error": self.requests_client_error.load(Ordering::Relaxed),
                "server_error": self.requests_server_error.load(Ordering::Relaxed),
                "writes": self.write_requests_total.load(Ordering::Relaxed),
            },
            "rate_limiting": {
                "rejected": self.rate_limit_rejected.load(Ordering::Relaxed),
            },
            "websocket": {
                "connections": self.websocket_connections.load(Ordering::Relaxed),
                "messages_sent": self.websocket_messages_sent.load(Ordering::Relaxed),
                "notifications_published": self.notifications_published.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
    is_write: bool,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>, is_write: bool) -> Self {
        Self {
            start: Instant::now(),
            metrics,
            is_write,
        }
    }

    pub fn finish(self, status: u16) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(status, self.is_write, latency_ms);
    }
}

/// Layer that times every request into [`GatewayMetrics`].
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<GatewayMetrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for MetricsService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let timer = RequestTimer::new(
            Arc::clone(&self.metrics),
            super::is_write_method(req.method()),
        );

        Box::pin(async move {
            let result = inner.call(req).await;
            match &result {
                Ok(response) => timer.finish(response.status().as_u16()),
                Err(_) => timer.finish(500),
            }
            result
        })
    }
}
