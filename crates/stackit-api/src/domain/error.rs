//! Gateway error types and their HTTP rendering.
//!
//! Clients see either `{ "msg": "..." }` or, for rejected input,
//! `{ "errors": [ { "msg", "param", "location" } ] }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stackit_forum::{Entity, FieldError, ForumError};
use tracing::error;

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Message { msg: String },
    Fields { errors: Vec<FieldError> },
}

/// An error on its way back to the client.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Message { msg: msg.into() },
        }
    }

    pub fn not_found(entity: Entity) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", entity))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::Fields { errors },
        }
    }

    /// Internal failure. Details stay in the logs.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later",
        )
    }

    /// Message text, if this is a plain message error.
    pub fn message(&self) -> Option<&str> {
        match &self.body {
            ErrorBody::Message { msg } => Some(msg),
            ErrorBody::Fields { .. } => None,
        }
    }
}

impl From<ForumError> for ApiError {
    fn from(err: ForumError) -> Self {
        match err {
            ForumError::NotFound(entity) => ApiError::not_found(entity),
            ForumError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ForumError::Validation(errors) => ApiError::validation(errors),
            ForumError::BadRequest(msg) => ApiError::bad_request(msg),
            internal => {
                error!(error = %internal, "forum operation failed");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Errors that stop the gateway itself.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
