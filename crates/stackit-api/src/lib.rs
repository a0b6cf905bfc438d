//! # StackIt API
//!
//! REST and WebSocket gateway in front of [`stackit_forum::ForumService`].
//!
//! ```text
//!   client ──HTTP──→ Cors → Tracing → Metrics → RateLimit → Timeout → BodyLimit
//!                                                                       │
//!                     /api/{auth,questions,answers,comments,           ▼
//!                           notifications,users}          ──→ ForumService
//!                                                                       │
//!   client ←──WS──── /ws  ←── NotificationHub (per-user rooms) ←────────┘
//! ```
//!
//! Private routes take an [`AuthUser`], which verifies the HS256 bearer
//! token issued by the external identity provider.

pub mod domain;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod ws;

pub use domain::config::{ConfigError, GatewayConfig, StorageBackend};
pub use domain::error::{ApiError, ErrorBody, GatewayError};
pub use middleware::{AuthUser, Claims, GatewayMetrics, TokenUser, TokenVerifier};
pub use service::{ApiGatewayService, AppState};
pub use ws::NotificationHub;
