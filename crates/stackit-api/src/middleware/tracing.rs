//! Per-request tracing spans.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
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
        let span = request_span(&req);

        Box::pin(
            async move {
                let result = inner.call(req).await;
                match &result {
                    Ok(response) => {
                        let status = response.status();
                        Span::current().record("http.status_code", status.as_u16());
                        if status.is_server_error() {
                            tracing::error!(status = status.as_u16(), "request failed");
                        } else {
                            tracing::debug!(status = status.as_u16(), "request finished");
                        }
                    }
                    Err(_) => {
                        Span::current().record("http.status_code", 500u16);
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}

fn request_span<B>(req: &Request<B>) -> Span {
    info_span!(
        "api_request",
        http.method = %req.method(),
        http.target = %req.uri().path(),
        http.status_code = tracing::field::Empty,
    )
}
