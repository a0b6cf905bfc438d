use super::{parse_id, run};
use crate::domain::error::ApiError;
use crate::middleware::AuthUser;
use crate::service::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use stackit_forum::{AnswerView, Entity, QuestionView, UserProfile};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/:id", get(profile))
        .route("/:id/questions", get(questions))
        .route("/:id/answers", get(answers))
}

async fn me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    run(&state, move |forum| forum.current_user(actor))
        .await
        .map(Json)
}

async fn profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_id(&id, Entity::User)?;
    run(&state, move |forum| forum.get_user(id)).await.map(Json)
}

async fn questions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<QuestionView>>, ApiError> {
    let id = parse_id(&id, Entity::User)?;
    run(&state, move |forum| forum.user_questions(id))
        .await
        .map(Json)
}

async fn answers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AnswerView>>, ApiError> {
    let id = parse_id(&id, Entity::User)?;
    run(&state, move |forum| forum.user_answers(id))
        .await
        .map(Json)
}
