use super::{message, parse_id, run, Message};
use crate::domain::error::ApiError;
use crate::middleware::AuthUser;
use crate::service::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use stackit_forum::{Entity, Notification};
use tracing::debug;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/mark-read/:id", put(mark_read))
        .route("/mark-all-read", put(mark_all_read))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    run(&state, move |forum| forum.notifications_for(actor))
        .await
        .map(Json)
}

async fn mark_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let id = parse_id(&id, Entity::Notification)?;
    run(&state, move |forum| forum.mark_read(actor, id))
        .await
        .map(Json)
}

async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Message>, ApiError> {
    let changed = run(&state, move |forum| forum.mark_all_read(actor)).await?;
    debug!(user = %actor, changed, "mark-all-read");
    Ok(message("All notifications marked as read"))
}
