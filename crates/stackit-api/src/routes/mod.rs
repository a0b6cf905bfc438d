//! REST routes under `/api`.
//!
//! Handlers are thin: parse path ids and bodies, run the forum operation on
//! the blocking pool, and render the result or the error.

pub mod answers;
pub mod auth;
pub mod comments;
pub mod notifications;
pub mod questions;
pub mod users;

use crate::domain::error::ApiError;
use crate::service::AppState;
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stackit_forum::{Entity, ForumResult, ForumService};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// All REST routes, to be nested under `/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/questions", questions::router())
        .nest("/answers", answers::router())
        .nest("/comments", comments::router())
        .nest("/notifications", notifications::router())
        .nest("/users", users::router())
}

/// Run a forum operation off the async workers. The service holds a
/// blocking lock and password hashing is CPU-bound.
pub(crate) async fn run<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ForumService) -> ForumResult<T> + Send + 'static,
{
    let forum = Arc::clone(&state.forum);
    tokio::task::spawn_blocking(move || op(&forum))
        .await
        .map_err(|e| {
            error!(error = %e, "forum task did not complete");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

/// A path id. Anything that is not a UUID cannot name a document, so it is
/// reported as that document not existing.
pub(crate) fn parse_id(raw: &str, entity: Entity) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(entity))
}

/// `{ "msg": ... }` success body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub msg: &'static str,
}

pub(crate) fn message(msg: &'static str) -> Json<Message> {
    Json(Message { msg })
}

/// JSON request body whose decode failures render as `{ "msg": ... }`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(body_error(rejection)),
        }
    }
}

fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError::new(rejection.status(), rejection.body_text())
}
