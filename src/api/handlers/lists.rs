use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{
        auth::{CurrentUser, MaybeUser},
        AppState,
    },
    error::AppResult,
    models::{CustomList, DbId},
    services::lists::{self, ListDetail, ListForm},
};

#[derive(Debug, Deserialize)]
pub struct AddMovieRequest {
    pub movie_id: DbId,
}

pub async fn my_lists(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<CustomList>>> {
    Ok(Json(lists::user_lists(state.store.as_ref(), current.user.id).await?))
}

pub async fn create_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<ListForm>,
) -> AppResult<(StatusCode, Json<CustomList>)> {
    let list = lists::create_list(state.store.as_ref(), current.user.id, request).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn view_list(
    State(state): State<AppState>,
    Path(list_id): Path<DbId>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<ListDetail>> {
    let detail = lists::view_list(state.store.as_ref(), list_id, viewer.map(|u| u.id)).await?;
    Ok(Json(detail))
}

pub async fn add_movie(
    State(state): State<AppState>,
    Path(list_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<AddMovieRequest>,
) -> AppResult<Json<CustomList>> {
    let list =
        lists::add_movie(state.store.as_ref(), list_id, current.user.id, request.movie_id).await?;
    Ok(Json(list))
}

pub async fn remove_movie(
    State(state): State<AppState>,
    Path((list_id, movie_id)): Path<(DbId, DbId)>,
    current: CurrentUser,
) -> AppResult<Json<CustomList>> {
    let list = lists::remove_movie(state.store.as_ref(), list_id, current.user.id, movie_id).await?;
    Ok(Json(list))
}

pub async fn delete_list(
    State(state): State<AppState>,
    Path(list_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<StatusCode> {
    lists::delete_list(state.store.as_ref(), list_id, current.user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
