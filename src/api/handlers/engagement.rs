use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    api::{auth::CurrentUser, AppState},
    error::AppResult,
    models::{DbId, Rating, Review, Upserted},
    services::engagement::{self, RatingForm, ReviewForm},
};

pub async fn rate_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<RatingForm>,
) -> AppResult<Json<Upserted<Rating>>> {
    let rating =
        engagement::rate_movie(state.store.as_ref(), current.user.id, movie_id, request).await?;
    Ok(Json(rating))
}

pub async fn review_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<ReviewForm>,
) -> AppResult<Json<Upserted<Review>>> {
    let review =
        engagement::review_movie(state.store.as_ref(), current.user.id, movie_id, request).await?;
    Ok(Json(review))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(movie_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<Value>> {
    let favorited =
        engagement::toggle_favorite(state.store.as_ref(), current.user.id, movie_id).await?;
    Ok(Json(json!({ "favorited": favorited })))
}

pub async fn toggle_watch_later(
    State(state): State<AppState>,
    Path(movie_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<Value>> {
    let watch_later =
        engagement::toggle_watch_later(state.store.as_ref(), current.user.id, movie_id).await?;
    Ok(Json(json!({ "watch_later": watch_later })))
}
