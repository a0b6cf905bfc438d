//! Answer routes. `/:id` names the question for POST and GET and the
//! answer for DELETE.

use super::{message, parse_id, run, JsonBody, Message};
use crate::domain::error::ApiError;
use crate::middleware::AuthUser;
use crate::service::AppState;
use axum::extract::{Path, State};
use axum::routing::{post, put};
use axum::{Json, Router};
use stackit_forum::{Answer, AnswerView, Entity, NewContent};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", post(create).get(list).delete(remove))
        .route("/accept/:id", put(accept))
        .route("/vote/:id/:vote_type", put(vote))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(question_id): Path<String>,
    JsonBody(input): JsonBody<NewContent>,
) -> Result<Json<Answer>, ApiError> {
    let question_id = parse_id(&question_id, Entity::Question)?;
    run(&state, move |forum| {
        forum.post_answer(actor, question_id, &input.content)
    })
    .await
    .map(Json)
}

async fn list(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<Vec<AnswerView>>, ApiError> {
    let question_id = parse_id(&question_id, Entity::Question)?;
    run(&state, move |forum| forum.answers_for_question(question_id))
        .await
        .map(Json)
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id, Entity::Answer)?;
    run(&state, move |forum| forum.delete_answer(actor, id)).await?;
    Ok(message("Answer removed"))
}

async fn accept(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Answer>, ApiError> {
    let id = parse_id(&id, Entity::Answer)?;
    run(&state, move |forum| forum.accept_answer(actor, id))
        .await
        .map(Json)
}

async fn vote(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((id, vote_type)): Path<(String, String)>,
) -> Result<Json<Answer>, ApiError> {
    let id = parse_id(&id, Entity::Answer)?;
    run(&state, move |forum| forum.vote_answer(actor, id, &vote_type))
        .await
        .map(Json)
}
