use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{PageQuery, SearchQuery};
use crate::{
    api::{auth::StaffUser, AppState},
    error::AppResult,
    models::{Movie, TmdbMovieSummary},
    services::tmdb_import,
};

pub async fn search(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<TmdbMovieSummary>> {
    Json(tmdb_import::search(state.catalog.as_ref(), params.q.as_deref()).await)
}

pub async fn popular(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(params): Query<PageQuery>,
) -> Json<Vec<TmdbMovieSummary>> {
    let page = params
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(1);
    Json(tmdb_import::popular(state.catalog.as_ref(), page).await)
}

pub async fn import_movie(
    State(state): State<AppState>,
    Path(tmdb_id): Path<u64>,
    StaffUser(staff): StaffUser,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = tmdb_import::import_movie(
        state.store.as_ref(),
        state.catalog.as_ref(),
        &state.config,
        tmdb_id,
    )
    .await?;
    tracing::info!(user_id = staff.id, movie_id = movie.id, "Staff imported movie");
    Ok((StatusCode::CREATED, Json(movie)))
}
