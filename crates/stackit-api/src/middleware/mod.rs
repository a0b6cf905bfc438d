//! Middleware stack for the gateway.
//!
//! Layer order, outermost first:
//! Cors → Tracing → Metrics → RateLimit → Timeout → BodyLimit → Handler.
//! Authentication is an extractor on the private handlers rather than a
//! layer.

pub mod auth;
pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;

pub use auth::{AuthUser, Claims, TokenUser, TokenVerifier};
pub use cors::create_cors_layer;
pub use metrics::{GatewayMetrics, MetricsLayer, RequestTimer};
pub use rate_limit::{RateLimitLayer, RateLimitState};
pub use tracing::TracingLayer;

use axum::http::Method;

/// Methods that can change forum state and draw from the write bucket.
pub fn is_write_method(method: &Method) -> bool {
    ![Method::GET, Method::HEAD, Method::OPTIONS].contains(method)
}
