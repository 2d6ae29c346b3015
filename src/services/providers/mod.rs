/// External movie catalog abstraction
///
/// The catalog is only consulted by staff when importing titles, so a single
/// provider (TMDB) backs it. Tests swap in a mock or an in-process fake.
use crate::{
    error::AppResult,
    models::{TmdbMovieDetails, TmdbMovieSummary},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for external movie catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieCatalogProvider: Send + Sync {
    /// Search movies by title
    async fn search_movies(&self, query: &str, page: u32) -> AppResult<Vec<TmdbMovieSummary>>;

    /// Full details of one movie with credits and videos
    async fn movie_details(&self, tmdb_id: u64) -> AppResult<TmdbMovieDetails>;

    /// Most popular movies of a catalog genre
    async fn discover_by_genre(&self, genre_id: u64, page: u32)
        -> AppResult<Vec<TmdbMovieSummary>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
