//! Gateway configuration with validation.
//!
//! Every section has serde defaults so a partial document (or none at all)
//! yields a working configuration. [`GatewayConfig::from_env`] layers the
//! deployment environment variables on top of the defaults.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener
    pub http: HttpConfig,
    /// Token verification
    pub auth: AuthConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Per-IP rate limiting
    pub rate_limit: RateLimitConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// Request timeouts
    pub timeouts: TimeoutConfig,
    /// Notification socket settings
    pub websocket: WebSocketConfig,
    /// Document store backend
    pub storage: StorageConfig,
}

impl GatewayConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known
    /// variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.http.port = parse_var("PORT", &port)?;
        }
        if let Some(host) = lookup("STACKIT_HOST") {
            config.http.host = parse_var("STACKIT_HOST", &host)?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Some(client) = lookup("CLIENT_URL") {
            config.cors.allowed_origins = client
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(dir) = lookup("STACKIT_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("STACKIT_STORAGE") {
            config.storage.backend = parse_var("STACKIT_STORAGE", &backend)?;
        }
        if let Some(rps) = lookup("STACKIT_RATE_LIMIT_RPS") {
            config.rate_limit.requests_per_second = parse_var("STACKIT_RATE_LIMIT_RPS", &rps)?;
        }
        if let Some(trust) = lookup("STACKIT_TRUST_PROXY") {
            config.rate_limit.trust_proxy_headers = parse_var("STACKIT_TRUST_PROXY", &trust)?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        if self.rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "requests_per_second cannot be 0".into(),
            ));
        }
        if self.rate_limit.writes_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "writes_per_second cannot be 0".into(),
            ));
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        if self.timeouts.request.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }
        if self.websocket.idle_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "websocket idle timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVariable {
            name,
            value: value.to_string(),
        })
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 5000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5000,
        }
    }
}

/// Token verification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider that issues tokens.
    pub jwt_secret: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS headers
    pub enabled: bool,
    /// Allowed origins ("*" for any)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed request headers
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime in seconds
    pub max_age: u64,
    /// Allow credentials
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: ["content-type", "authorization", "x-auth-token"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_age: 3600,
            allow_credentials: false,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per second per IP (reads)
    pub requests_per_second: u32,
    /// Write requests per second per IP (any non-GET method)
    pub writes_per_second: u32,
    /// Burst allowance (token bucket)
    pub burst_size: u32,
    /// Enable rate limiting
    pub enabled: bool,
    /// IPs to whitelist from rate limiting, matched against the peer
    /// address unless proxy headers are trusted
    pub whitelist: Vec<IpAddr>,
    /// Key buckets on `X-Forwarded-For`/`X-Real-IP`. Only enable behind a
    /// reverse proxy that overwrites these headers.
    pub trust_proxy_headers: bool,
    /// Buckets idle for longer than this are dropped
    #[serde(with = "humantime_serde")]
    pub bucket_idle: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 50,
            writes_per_second: 5,
            burst_size: 100,
            enabled: true,
            whitelist: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
            trust_proxy_headers: false,
            bucket_idle: Duration::from_secs(300),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for any HTTP request
    #[serde(with = "humantime_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
        }
    }
}

/// Notification socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Close connections that send nothing for this long
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Notifications buffered per user room before slow listeners lag
    pub room_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            room_buffer: 64,
        }
    }
}

/// Which document store backs the forum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// RocksDB directory (ignored by the memory backend)
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data/stackit"),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No token secret configured
    #[error("JWT secret is not configured")]
    MissingJwtSecret,
    /// Environment variable could not be parsed
    #[error("invalid value for {name}: {value:?}")]
    InvalidVariable { name: &'static str, value: String },
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Durations written as `"500ms"`, `"30s"`, `"5m"` or bare seconds.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be tried before the bare "s" suffix.
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
