//! Account registration. Tokens are minted by the identity provider that
//! shares the signing secret; this service only verifies them.

use super::{run, JsonBody};
use crate::domain::error::ApiError;
use crate::service::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use stackit_forum::{NewUser, UserProfile};

pub fn router() -> Router<AppState> {
    Router::new().route("/register", post(register))
}

async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewUser>,
) -> Result<Json<UserProfile>, ApiError> {
    run(&state, move |forum| forum.register_user(input))
        .await
        .map(Json)
}
