use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::SearchQuery;
use crate::{
    api::{auth::CurrentUser, AppState},
    error::AppResult,
    models::DbId,
    services::social::{self, PublicProfile, SocialHub},
};

pub async fn directory(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SocialHub>> {
    let hub = social::directory(
        state.store.as_ref(),
        current.user.id,
        params.q.as_deref(),
        params.page.as_deref(),
    )
    .await?;
    Ok(Json(hub))
}

pub async fn public_profile(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<PublicProfile>> {
    let profile = social::public_profile(state.store.as_ref(), current.user.id, user_id).await?;
    Ok(Json(profile))
}
