use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::{auth::CurrentUser, AppState},
    error::AppResult,
    services::{
        accounts::{self, Registration, Session},
        social::{self, OwnProfile},
    },
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<Registration>,
) -> AppResult<(StatusCode, Json<Session>)> {
    let session = accounts::register(state.store.as_ref(), &state.config, request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<Session>> {
    let session = accounts::login(state.store.as_ref(), &request.username, &request.password).await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Value>> {
    accounts::logout(state.store.as_ref(), current.token).await?;
    tracing::info!(user_id = current.user.id, "User logged out");
    Ok(Json(json!({ "logged_out": true })))
}

/// The signed-in user's profile page
pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<OwnProfile>> {
    let profile = social::own_profile(state.store.as_ref(), &state.config, current.user).await?;
    Ok(Json(profile))
}
