use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    config::Config,
    db::{CatalogStore, Store},
    error::{AppError, AppResult},
    models::{
        tmdb::{local_genre_name, TmdbVideo, TMDB_ADVENTURE_GENRE_ID},
        Classification, Movie, NewMovie, PersonRole, TmdbMovieDetails, TmdbMovieSummary,
    },
    services::providers::MovieCatalogProvider,
};

/// Results shown per TMDB search
pub const SEARCH_LIMIT: usize = 20;

/// Cast members imported per movie
const CAST_LIMIT: usize = 5;

const UNTITLED: &str = "Untitled";
const NO_SYNOPSIS: &str = "No synopsis available";
const UNKNOWN_COUNTRY: &str = "Unknown";
const DEFAULT_LANGUAGE: &str = "es";
const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

fn default_release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// TMDB details flattened into local catalog fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedMovie {
    pub title: String,
    pub original_title: String,
    pub synopsis: String,
    pub release_date: NaiveDate,
    pub year: i32,
    pub duration_minutes: i32,
    pub country: String,
    pub language: String,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub genre_names: Vec<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
}

/// Title search; provider failures degrade to no results
pub async fn search(
    provider: &dyn MovieCatalogProvider,
    query: Option<&str>,
) -> Vec<TmdbMovieSummary> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return vec![];
    };

    match provider.search_movies(query, 1).await {
        Ok(mut results) => {
            results.truncate(SEARCH_LIMIT);
            results
        }
        Err(e) => {
            tracing::warn!(provider = provider.name(), query = %query, error = %e, "Movie search failed");
            vec![]
        }
    }
}

/// Most popular adventure movies; provider failures degrade to no results
pub async fn popular(provider: &dyn MovieCatalogProvider, page: u32) -> Vec<TmdbMovieSummary> {
    match provider
        .discover_by_genre(TMDB_ADVENTURE_GENRE_ID, page.max(1))
        .await
    {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(provider = provider.name(), page, error = %e, "Popular movies lookup failed");
            vec![]
        }
    }
}

/// Copies a TMDB movie into the catalog with its director, cast and genres
pub async fn import_movie(
    store: &dyn Store,
    provider: &dyn MovieCatalogProvider,
    config: &Config,
    tmdb_id: u64,
) -> AppResult<Movie> {
    let details = provider.movie_details(tmdb_id).await.map_err(|e| {
        tracing::warn!(provider = provider.name(), tmdb_id, error = %e, "Movie details lookup failed");
        AppError::ExternalApi(format!("Could not fetch movie {} from TMDB", tmdb_id))
    })?;

    let imported = map_details(&details, config);

    if store.movie_exists(&imported.title, imported.year).await? {
        return Err(AppError::Conflict(format!(
            "'{}' ({}) is already in the catalog",
            imported.title, imported.year
        )));
    }

    let director_id = match &imported.director {
        Some(name) => Some(
            store
                .get_or_create_person(PersonRole::Director, name, &imported.country)
                .await?
                .id,
        ),
        None => None,
    };

    let mut actor_ids = Vec::with_capacity(imported.cast.len());
    for name in &imported.cast {
        let actor = store
            .get_or_create_person(PersonRole::Actor, name, &imported.country)
            .await?;
        if !actor_ids.contains(&actor.id) {
            actor_ids.push(actor.id);
        }
    }

    let mut genre_ids = Vec::with_capacity(imported.genre_names.len());
    for name in &imported.genre_names {
        genre_ids.push(store.get_or_create_genre(name).await?.id);
    }

    let movie = store
        .create_movie(NewMovie {
            title: imported.title,
            original_title: imported.original_title,
            synopsis: imported.synopsis,
            year: imported.year,
            duration_minutes: imported.duration_minutes,
            director_id,
            country: imported.country,
            language: imported.language,
            poster_url: imported.poster_url,
            trailer_url: imported.trailer_url,
            release_date: imported.release_date,
            budget: imported.budget,
            revenue: imported.revenue,
            classification: Classification::Pg13,
            genre_ids,
            actor_ids,
        })
        .await?;

    tracing::info!(tmdb_id, movie_id = movie.id, title = %movie.title, "Imported movie from TMDB");
    Ok(movie)
}

/// Applies the import fallbacks to a TMDB details payload
pub fn map_details(details: &TmdbMovieDetails, config: &Config) -> ImportedMovie {
    let release_date = details
        .release_date
        .as_deref()
        .and_then(|date| NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(default_release_date);

    let credits = details.credits.clone().unwrap_or_default();
    let director = credits
        .crew
        .iter()
        .find(|member| member.job == "Director")
        .map(|member| member.name.clone());
    let cast = credits
        .cast
        .iter()
        .take(CAST_LIMIT)
        .map(|member| member.name.clone())
        .collect();

    let mut genre_names: Vec<String> = Vec::new();
    for genre in &details.genres {
        let name = if genre.name.trim().is_empty() {
            local_genre_name(genre.id).map(str::to_string)
        } else {
            Some(genre.name.trim().to_string())
        };
        if let Some(name) = name {
            if !genre_names.contains(&name) {
                genre_names.push(name);
            }
        }
    }

    let language_prefix = config
        .tmdb_language
        .split('-')
        .next()
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_lowercase();
    let videos = details
        .videos
        .as_ref()
        .map(|videos| videos.results.as_slice())
        .unwrap_or_default();

    ImportedMovie {
        title: non_blank(details.title.as_deref()).unwrap_or_else(|| UNTITLED.to_string()),
        original_title: details.original_title.clone().unwrap_or_default(),
        synopsis: non_blank(details.overview.as_deref()).unwrap_or_else(|| NO_SYNOPSIS.to_string()),
        year: release_date.year(),
        release_date,
        duration_minutes: details.runtime.unwrap_or(0),
        country: details
            .production_countries
            .first()
            .map(|country| country.name.clone())
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
        language: details
            .original_language
            .as_deref()
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_uppercase(),
        poster_url: details
            .poster_path
            .as_deref()
            .map(|path| format!("{}{}", config.tmdb_image_base_url, path)),
        trailer_url: pick_trailer(videos, &language_prefix),
        budget: details.budget,
        revenue: details.revenue,
        genre_names,
        director,
        cast,
    }
}

/// First YouTube trailer in `language`, else the first YouTube trailer at all
pub fn pick_trailer(videos: &[TmdbVideo], language: &str) -> Option<String> {
    let trailers: Vec<&TmdbVideo> = videos
        .iter()
        .filter(|video| video.site == "YouTube" && video.video_type == "Trailer")
        .collect();

    trailers
        .iter()
        .find(|video| {
            video
                .iso_639_1
                .as_deref()
                .is_some_and(|lang| lang.contains(language))
        })
        .or_else(|| trailers.first())
        .map(|video| format!("{}{}", YOUTUBE_WATCH_URL, video.key))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
