use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use super::AppState;
use crate::{
    db::AccountStore,
    error::{AppError, AppResult},
    models::User,
};

/// A request made with a valid session token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: Uuid,
}

/// The session user when the request carries a valid token
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// A signed-in staff member
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

/// Parses `Authorization: Bearer <uuid>`
fn bearer_token(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
}

/// Resolves the session and makes sure the account has a profile
async fn session_user(state: &AppState, token: Uuid) -> AppResult<Option<User>> {
    let Some(user) = state.store.find_session_user(token).await? else {
        return Ok(None);
    };
    state.store.ensure_profile(user.id).await?;
    Ok(Some(user))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let user = session_user(state, token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired or invalid".to_string()))?;

        Ok(CurrentUser { user, token })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(MaybeUser(session_user(state, token).await?)),
            None => Ok(MaybeUser(None)),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            tracing::warn!(user_id = user.id, "Staff-only endpoint refused");
            return Err(AppError::Forbidden(
                "Only staff members can do this".to_string(),
            ));
        }
        Ok(StaffUser(user))
    }
}
