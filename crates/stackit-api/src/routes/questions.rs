use super::{message, parse_id, run, JsonBody, Message};
use crate::domain::error::ApiError;
use crate::middleware::AuthUser;
use crate::service::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use stackit_forum::{Entity, NewQuestion, QuestionQuery, QuestionView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(show).put(update).delete(remove))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    JsonBody(input): JsonBody<NewQuestion>,
) -> Result<Json<QuestionView>, ApiError> {
    run(&state, move |forum| forum.create_question(actor, input))
        .await
        .map(Json)
}

/// `?tags=a,b&sortBy=createdAt|answersCount&order=asc|desc`
async fn list(
    State(state): State<AppState>,
    Query(query): Query<QuestionQuery>,
) -> Result<Json<Vec<QuestionView>>, ApiError> {
    run(&state, move |forum| forum.list_questions(&query))
        .await
        .map(Json)
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionView>, ApiError> {
    let id = parse_id(&id, Entity::Question)?;
    run(&state, move |forum| forum.get_question(id))
        .await
        .map(Json)
}

async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<NewQuestion>,
) -> Result<Json<QuestionView>, ApiError> {
    let id = parse_id(&id, Entity::Question)?;
    run(&state, move |forum| forum.update_question(actor, id, input))
        .await
        .map(Json)
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id, Entity::Question)?;
    run(&state, move |forum| forum.delete_question(actor, id)).await?;
    Ok(message("Question removed"))
}
