use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db::{CatalogStore, EngagementStore, Store, WatchPartyStore},
    error::{AppError, AppResult},
    models::{
        catalog::display_rating, DbId, Genre, Movie, MovieFilter, MovieOrder, MovieSummary,
        NewMovie, NewPerson, Page, PageWindow, Person, PersonRole, Rating, Review, User,
        WatchParty,
    },
    services::{recommendations, required_text},
};

/// Movies per catalog page
pub const PER_PAGE: u32 = 12;

const FEATURED_COUNT: u64 = 5;
const RECENT_COUNT: u64 = 6;
const HOME_RECOMMENDATIONS_SHOWN: usize = 6;
const DETAIL_REVIEWS: u64 = 10;
const DETAIL_WATCH_PARTIES: u64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub featured: Vec<MovieSummary>,
    pub recent: Vec<MovieSummary>,
    pub recommendations: Vec<MovieSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenrePage {
    pub genre: Genre,
    pub movies: Page<MovieSummary>,
}

/// Everything shown on a movie's page
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub movie: Movie,
    pub genres: Vec<Genre>,
    pub director: Option<Person>,
    pub actors: Vec<Person>,
    pub average_rating: f64,
    pub rating_count: i64,
    pub review_count: i64,
    pub reviews: Vec<Review>,
    pub user_rating: Option<Rating>,
    pub watch_parties: Vec<WatchParty>,
}

/// Staff form for genres
#[derive(Debug, Clone, Deserialize)]
pub struct NewGenre {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Looks up the movie or fails with 404
pub async fn require_movie(store: &dyn Store, movie_id: DbId) -> AppResult<Movie> {
    store
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))
}

/// The featured genre when it exists in the catalog
pub async fn featured_genre(store: &dyn Store, name: &str) -> AppResult<Option<Genre>> {
    store.find_genre_by_name(name).await
}

pub async fn home(
    store: &dyn Store,
    featured_genre_name: &str,
    viewer: Option<&User>,
) -> AppResult<HomePage> {
    let (featured, recent) = match featured_genre(store, featured_genre_name).await? {
        Some(genre) => {
            let filter = MovieFilter {
                genre_id: Some(genre.id),
                ..MovieFilter::default()
            };
            let featured = store
                .list_movies(&filter, MovieOrder::Best, FEATURED_COUNT, 0)
                .await?;
            let recent = store
                .list_movies(&filter, MovieOrder::Newest, RECENT_COUNT, 0)
                .await?;
            (featured, recent)
        }
        None => (vec![], vec![]),
    };

    let recommendations = match viewer {
        Some(user) => {
            let mut movies = recommendations::recommend_for_user(
                store,
                featured_genre_name,
                user.id,
                recommendations::PROFILE_RECOMMENDATIONS,
            )
            .await?;
            movies.truncate(HOME_RECOMMENDATIONS_SHOWN);
            movies
        }
        None => vec![],
    };

    Ok(HomePage {
        featured,
        recent,
        recommendations,
    })
}

/// Featured-genre listing, or the whole catalog when the genre is missing
pub async fn catalog(
    store: &dyn Store,
    featured_genre_name: &str,
    query: Option<&str>,
    order: Option<&str>,
    page: Option<&str>,
) -> AppResult<Page<MovieSummary>> {
    let genre = featured_genre(store, featured_genre_name).await?;
    let filter = MovieFilter {
        genre_id: genre.map(|g| g.id),
        text: non_blank(query),
        match_credits: false,
    };

    list_page(store, &filter, MovieOrder::from_param(order), page).await
}

/// Only the featured genre can be browsed
pub async fn genre_page(
    store: &dyn Store,
    featured_genre_name: &str,
    genre_id: DbId,
    page: Option<&str>,
) -> AppResult<GenrePage> {
    let genre = store
        .find_genre(genre_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Genre {} not found", genre_id)))?;

    if !genre.name.eq_ignore_ascii_case(featured_genre_name) {
        return Err(AppError::InvalidInput(format!(
            "Only the {} genre can be browsed",
            featured_genre_name
        )));
    }

    let filter = MovieFilter {
        genre_id: Some(genre.id),
        ..MovieFilter::default()
    };
    let movies = list_page(store, &filter, MovieOrder::Best, page).await?;

    Ok(GenrePage { genre, movies })
}

/// Matches titles, synopsis, genre names and director names
pub async fn search(
    store: &dyn Store,
    featured_genre_name: &str,
    query: Option<&str>,
) -> AppResult<Vec<MovieSummary>> {
    let Some(text) = non_blank(query) else {
        return Ok(vec![]);
    };

    let genre = featured_genre(store, featured_genre_name).await?;
    let filter = MovieFilter {
        genre_id: genre.map(|g| g.id),
        text: Some(text),
        match_credits: true,
    };

    let total = store.count_movies(&filter).await?;
    let movies = store.list_movies(&filter, MovieOrder::Az, total, 0).await?;

    tracing::debug!(count = movies.len(), "Searched catalog");
    Ok(movies)
}

/// Builds the movie page and records a viewing for the signed-in viewer
pub async fn movie_detail(
    store: &dyn Store,
    movie_id: DbId,
    viewer: Option<&User>,
) -> AppResult<MovieDetail> {
    let movie = require_movie(store, movie_id).await?;

    let genres = store.find_genres(&movie.genre_ids).await?;
    let director = match movie.director_id {
        Some(id) => store
            .find_people(PersonRole::Director, &[id])
            .await?
            .into_iter()
            .next(),
        None => None,
    };
    let mut actors = store.find_people(PersonRole::Actor, &movie.actor_ids).await?;
    actors.sort_by_key(|actor| {
        movie
            .actor_ids
            .iter()
            .position(|id| *id == actor.id)
            .unwrap_or(usize::MAX)
    });

    let (average, rating_count) = store.rating_stats(movie.id).await?;
    let review_count = store.count_reviews(movie.id).await?;
    let reviews = store.movie_reviews(movie.id, DETAIL_REVIEWS).await?;
    let watch_parties = store
        .upcoming_parties_for_movie(movie.id, Utc::now(), DETAIL_WATCH_PARTIES)
        .await?;

    let user_rating = match viewer {
        Some(user) => {
            let record = store.record_view(user.id, movie.id).await?;
            if record.created {
                tracing::debug!(user_id = user.id, movie_id = movie.id, "Recorded viewing");
            }
            store.find_rating(user.id, movie.id).await?
        }
        None => None,
    };

    Ok(MovieDetail {
        movie,
        genres,
        director,
        actors,
        average_rating: display_rating(average),
        rating_count,
        review_count,
        reviews,
        user_rating,
        watch_parties,
    })
}

/// Validates the form and that every referenced record exists
pub async fn create_movie(store: &dyn Store, mut movie: NewMovie) -> AppResult<Movie> {
    movie.validate()?;
    movie.title = movie.title.trim().to_string();

    movie.genre_ids.sort_unstable();
    movie.genre_ids.dedup();
    let genres = store.find_genres(&movie.genre_ids).await?;
    if genres.len() != movie.genre_ids.len() {
        return Err(AppError::InvalidInput(
            "One or more genres do not exist".to_string(),
        ));
    }

    if let Some(director_id) = movie.director_id {
        if store
            .find_people(PersonRole::Director, &[director_id])
            .await?
            .is_empty()
        {
            return Err(AppError::InvalidInput(format!(
                "Director {} does not exist",
                director_id
            )));
        }
    }

    let mut actor_ids = movie.actor_ids.clone();
    actor_ids.sort_unstable();
    actor_ids.dedup();
    if store.find_people(PersonRole::Actor, &actor_ids).await?.len() != actor_ids.len() {
        return Err(AppError::InvalidInput(
            "One or more actors do not exist".to_string(),
        ));
    }

    let created = store.create_movie(movie).await?;
    tracing::info!(movie_id = created.id, title = %created.title, "Created movie");
    Ok(created)
}

pub async fn create_genre(store: &dyn Store, genre: NewGenre) -> AppResult<Genre> {
    let name = required_text("Name", &genre.name, Some(100))?;
    if store.find_genre_by_name(&name).await?.is_some() {
        return Err(AppError::Conflict(format!("Genre '{}' already exists", name)));
    }

    let created = store.create_genre(&name, genre.description.trim()).await?;
    tracing::info!(genre_id = created.id, name = %created.name, "Created genre");
    Ok(created)
}

pub async fn create_person(
    store: &dyn Store,
    role: PersonRole,
    mut person: NewPerson,
) -> AppResult<Person> {
    person.name = required_text("Name", &person.name, Some(200))?;

    let created = store.create_person(role, person).await?;
    tracing::info!(person_id = created.id, role = role.label(), "Created person");
    Ok(created)
}

/// Summaries of the given movies in the given order, skipping unknown ids
pub async fn summaries_for(store: &dyn Store, movie_ids: &[DbId]) -> AppResult<Vec<MovieSummary>> {
    let mut summaries = Vec::with_capacity(movie_ids.len());
    for id in movie_ids {
        if let Some(movie) = store.find_movie(*id).await? {
            let (average_rating, rating_count) = store.rating_stats(movie.id).await?;
            summaries.push(MovieSummary {
                id: movie.id,
                title: movie.title,
                year: movie.year,
                poster_url: movie.poster_url,
                average_rating,
                rating_count,
            });
        }
    }
    Ok(summaries)
}

async fn list_page(
    store: &dyn Store,
    filter: &MovieFilter,
    order: MovieOrder,
    page: Option<&str>,
) -> AppResult<Page<MovieSummary>> {
    let total = store.count_movies(filter).await?;
    let window = PageWindow::resolve(page, total, PER_PAGE);
    let items = store
        .list_movies(filter, order, window.limit(), window.offset())
        .await?;
    Ok(window.into_page(items))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
