use axum::{extract::State, Json};

use crate::{
    api::{auth::CurrentUser, AppState},
    error::AppResult,
    models::Notification,
    services::notifications::{self, UnreadNotifications},
};

pub async fn list_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(
        notifications::all_notifications(state.store.as_ref(), current.user.id).await?,
    ))
}

pub async fn unread_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<UnreadNotifications>> {
    Ok(Json(
        notifications::unread_notifications(state.store.as_ref(), current.user.id).await?,
    ))
}
