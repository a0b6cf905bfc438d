//! Per-IP token bucket rate limiting.
//!
//! Every client IP gets two buckets: one for reads and a stricter one for
//! writes (any method that can change forum state).

use super::metrics::GatewayMetrics;
use crate::domain::config::RateLimitConfig;
use crate::domain::error::ApiError;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

/// Token buckets for one IP address
struct TokenBucket {
    read_limiter: DirectLimiter,
    write_limiter: DirectLimiter,
    last_access: Instant,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        let read_quota = Quota::per_second(non_zero(config.requests_per_second))
            .allow_burst(non_zero(config.burst_size));
        let write_quota = Quota::per_second(non_zero(config.writes_per_second))
            .allow_burst(non_zero(config.burst_size / 10));

        Self {
            read_limiter: RateLimiter::direct(read_quota),
            write_limiter: RateLimiter::direct(write_quota),
            last_access: Instant::now(),
        }
    }

    /// Take a token, or report how long until one is available.
    fn check(&mut self, is_write: bool) -> Result<(), Duration> {
        self.last_access = Instant::now();
        let limiter = if is_write {
            &self.write_limiter
        } else {
            &self.read_limiter
        };
        limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

/// Rate limiter state shared across requests
pub struct RateLimitState {
    buckets: DashMap<IpAddr, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Check if request should be allowed
    pub fn check(&self, ip: IpAddr, is_write: bool) -> Result<(), Duration> {
        if !self.config.enabled || self.config.whitelist.contains(&ip) {
            return Ok(());
        }

        let mut bucket = self.buckets.entry(ip).or_insert_with(|| {
            debug!(ip = %ip, "Creating new rate limit bucket");
            TokenBucket::new(&self.config)
        });
        bucket.check(is_write)
    }

    /// Drop buckets that have not been touched for `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_access) <= max_age);
    }

    pub fn trusts_proxy_headers(&self) -> bool {
        self.config.trust_proxy_headers
    }

    /// Number of tracked IPs
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
    metrics: Arc<GatewayMetrics>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            state: Arc::new(RateLimitState::new(config)),
            metrics,
        }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req, state.trusts_proxy_headers());
            let is_write = super::is_write_method(req.method());

            match state.check(ip, is_write) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    metrics.record_rate_limit_rejection();
                    warn!(
                        ip = %ip,
                        retry_after_ms = retry_after.as_millis() as u64,
                        is_write = is_write,
                        "Rate limit exceeded"
                    );
                    Ok(rate_limit_response(retry_after))
                }
            }
        })
    }
}

/// Client IP for bucketing: the connected peer, or the first forwarding
/// header value when `trust_proxy` is set.
fn extract_client_ip<B>(req: &Request<B>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(req) {
            return ip;
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    let headers = req.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        })
}

/// 429 with a whole-second `Retry-After`.
fn rate_limit_response(retry_after: Duration) -> Response {
    let secs = retry_after.as_millis().div_ceil(1000).max(1) as u64;
    let mut response = ApiError::rate_limited().into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    response
}

/// Background task to clean up stale rate limit buckets
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration, max_age: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup(max_age);
        debug!(buckets = state.bucket_count(), "rate limit buckets swept");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::net::Ipv4Addr;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: 10,
            writes_per_second: 2,
            burst_size: 20,
            enabled: true,
            whitelist: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))],
            trust_proxy_headers: false,
            bucket_idle: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_rate_limit_allows_within_limit() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        for _ in 0..10 {
            assert!(state.check(ip, false).is_ok());
        }
    }

    #[test]
    fn test_rate_limit_blocks_over_limit() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        for _ in 0..25 {
            let _ = state.check(ip, false);
        }
        assert!(state.check(ip, false).is_err());
    }

    #[test]
    fn test_whitelist_and_disabled_bypass() {
        let state = RateLimitState::new(test_config());
        let whitelisted = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        for _ in 0..100 {
            assert!(state.check(whitelisted, true).is_ok());
        }

        let mut config = test_config();
        config.enabled = false;
        let state = RateLimitState::new(config);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3));
        for _ in 0..100 {
            assert!(state.check(ip, true).is_ok());
        }
        assert_eq!(state.bucket_count(), 0);
    }

    #[test]
    fn test_writes_exhaust_before_reads() {
        let state = RateLimitState::new(test_config());
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 4));

        // burst_size / 10 == 2 write tokens
        assert!(state.check(ip, true).is_ok());
        assert!(state.check(ip, true).is_ok());
        assert!(state.check(ip, true).is_err());
        assert!(state.check(ip, false).is_ok());
    }

    #[test]
    fn test_cleanup_removes_stale_buckets() {
        let state = RateLimitState::new(test_config());
        let _ = state.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), false);
        assert_eq!(state.bucket_count(), 1);

        state.cleanup(Duration::from_secs(60));
        assert_eq!(state.bucket_count(), 1);

        std::thread::sleep(Duration::from_millis(5));
        state.cleanup(Duration::ZERO);
        assert_eq!(state.bucket_count(), 0);
    }

    #[test]
    fn test_client_ip_headers_need_trust() {
        let peer: SocketAddr = "203.0.113.9:40000".parse().unwrap();
        let spoofed = || {
            let mut req = Request::builder()
                .header("x-forwarded-for", "127.0.0.1, 10.0.0.1")
                .body(())
                .unwrap();
            req.extensions_mut().insert(ConnectInfo(peer));
            req
        };

        assert_eq!(extract_client_ip(&spoofed(), false), peer.ip());
        assert_eq!(extract_client_ip(&spoofed(), true), IpAddr::from([127, 0, 0, 1]));

        let req = Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&req, true), "198.51.100.2".parse::<IpAddr>().unwrap());

        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract_client_ip(&req, false), IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn test_response_has_retry_after() {
        let response = rate_limit_response(Duration::from_millis(1500));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
