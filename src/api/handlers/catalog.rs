use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{PageQuery, SearchQuery};
use crate::{
    api::{
        auth::{CurrentUser, MaybeUser, StaffUser},
        AppState,
    },
    db::CatalogStore,
    error::AppResult,
    models::{DbId, Genre, Movie, MovieSummary, NewMovie, NewPerson, Page, Person, PersonRole},
    services::{
        catalog::{self, GenrePage, HomePage, MovieDetail, NewGenre},
        recommendations::{self, PAGE_RECOMMENDATIONS},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

pub async fn home(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<HomePage>> {
    let page = catalog::home(state.store.as_ref(), state.featured_genre(), viewer.as_ref()).await?;
    Ok(Json(page))
}

pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.store.list_genres().await?))
}

pub async fn browse_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> AppResult<Json<Page<MovieSummary>>> {
    let page = catalog::catalog(
        state.store.as_ref(),
        state.featured_genre(),
        params.q.as_deref(),
        params.order.as_deref(),
        params.page.as_deref(),
    )
    .await?;
    Ok(Json(page))
}

pub async fn genre_movies(
    State(state): State<AppState>,
    Path(genre_id): Path<DbId>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<GenrePage>> {
    let page = catalog::genre_page(
        state.store.as_ref(),
        state.featured_genre(),
        genre_id,
        params.page.as_deref(),
    )
    .await?;
    Ok(Json(page))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let movies =
        catalog::search(state.store.as_ref(), state.featured_genre(), params.q.as_deref()).await?;
    Ok(Json(movies))
}

pub async fn movie_detail(
    State(state): State<AppState>,
    Path(movie_id): Path<DbId>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<MovieDetail>> {
    let detail = catalog::movie_detail(state.store.as_ref(), movie_id, viewer.as_ref()).await?;
    Ok(Json(detail))
}

/// Dedicated recommendations page
pub async fn recommended_movies(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let movies = recommendations::recommend_for_user(
        state.store.as_ref(),
        state.featured_genre(),
        current.user.id,
        PAGE_RECOMMENDATIONS,
    )
    .await?;
    Ok(Json(movies))
}

pub async fn create_movie(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(request): Json<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = catalog::create_movie(state.store.as_ref(), request).await?;
    tracing::info!(user_id = staff.id, movie_id = movie.id, "Staff added movie");
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn create_genre(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Json(request): Json<NewGenre>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    let genre = catalog::create_genre(state.store.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn create_director(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Json(request): Json<NewPerson>,
) -> AppResult<(StatusCode, Json<Person>)> {
    let person = catalog::create_person(state.store.as_ref(), PersonRole::Director, request).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn create_actor(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Json(request): Json<NewPerson>,
) -> AppResult<(StatusCode, Json<Person>)> {
    let person = catalog::create_person(state.store.as_ref(), PersonRole::Actor, request).await?;
    Ok((StatusCode::CREATED, Json(person)))
}
