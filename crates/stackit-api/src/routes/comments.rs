use super::{message, parse_id, run, JsonBody, Message};
use crate::domain::error::ApiError;
use crate::middleware::AuthUser;
use crate::service::AppState;
use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use stackit_forum::{Comment, CommentView, Entity, NewContent};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/question/:id",
            post(comment_on_question).get(question_comments),
        )
        .route("/answer/:id", post(comment_on_answer).get(answer_comments))
        .route("/:id", delete(remove))
}

async fn comment_on_question(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(question_id): Path<String>,
    JsonBody(input): JsonBody<NewContent>,
) -> Result<Json<Comment>, ApiError> {
    let question_id = parse_id(&question_id, Entity::Question)?;
    run(&state, move |forum| {
        forum.comment_on_question(actor, question_id, &input.content)
    })
    .await
    .map(Json)
}

async fn question_comments(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let question_id = parse_id(&question_id, Entity::Question)?;
    run(&state, move |forum| forum.comments_for_question(question_id))
        .await
        .map(Json)
}

async fn comment_on_answer(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(answer_id): Path<String>,
    JsonBody(input): JsonBody<NewContent>,
) -> Result<Json<Comment>, ApiError> {
    let answer_id = parse_id(&answer_id, Entity::Answer)?;
    run(&state, move |forum| {
        forum.comment_on_answer(actor, answer_id, &input.content)
    })
    .await
    .map(Json)
}

async fn answer_comments(
    State(state): State<AppState>,
    Path(answer_id): Path<String>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let answer_id = parse_id(&answer_id, Entity::Answer)?;
    run(&state, move |forum| forum.comments_for_answer(answer_id))
        .await
        .map(Json)
}

async fn remove(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id, Entity::Comment)?;
    run(&state, move |forum| forum.delete_comment(actor, id)).await?;
    Ok(message("Comment removed"))
}
