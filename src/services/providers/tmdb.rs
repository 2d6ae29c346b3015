/// The Movie Database (TMDB) API provider
///
/// API Flow:
/// 1. Search: /search/movie → paged summaries
/// 2. Details: /movie/{id}?append_to_response=credits,videos → one request per import
/// 3. Discover: /discover/movie?with_genres={id}&sort_by=popularity.desc
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{tmdb::TmdbPagedResponse, TmdbMovieDetails, TmdbMovieSummary},
    services::providers::MovieCatalogProvider,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
        }
    }

    /// GET `{api_url}{path}` with the credentials and locale every call carries
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        if self.api_key.is_empty() {
            return Err(AppError::ExternalApi(
                "TMDB API key is not configured".to_string(),
            ));
        }

        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
                ("include_adult", "false"),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn fetch_search(&self, query: &str, page: u32) -> AppResult<Vec<TmdbMovieSummary>> {
        let response: TmdbPagedResponse = self
            .get_json(
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;

        tracing::info!(
            query = %query,
            page,
            result_count = response.results.len(),
            "Searched TMDB"
        );
        Ok(response.results)
    }

    async fn fetch_details(&self, tmdb_id: u64) -> AppResult<TmdbMovieDetails> {
        let details: TmdbMovieDetails = self
            .get_json(
                &format!("/movie/{}", tmdb_id),
                &[("append_to_response", "credits,videos".to_string())],
            )
            .await?;

        tracing::info!(tmdb_id, "Fetched TMDB movie details");
        Ok(details)
    }

    async fn fetch_discover(&self, genre_id: u64, page: u32) -> AppResult<Vec<TmdbMovieSummary>> {
        let response: TmdbPagedResponse = self
            .get_json(
                "/discover/movie",
                &[
                    ("with_genres", genre_id.to_string()),
                    ("sort_by", "popularity.desc".to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        tracing::info!(
            genre_id,
            page,
            result_count = response.results.len(),
            "Discovered TMDB movies"
        );
        Ok(response.results)
    }
}

#[async_trait::async_trait]
impl MovieCatalogProvider for TmdbProvider {
    async fn search_movies(&self, query: &str, page: u32) -> AppResult<Vec<TmdbMovieSummary>> {
        let key = CacheKey::TmdbSearch {
            query: query.to_string(),
            page,
        };
        cached!(self.cache, key, SEARCH_CACHE_TTL, self.fetch_search(query, page))
    }

    async fn movie_details(&self, tmdb_id: u64) -> AppResult<TmdbMovieDetails> {
        let key = CacheKey::TmdbDetails(tmdb_id);
        cached!(self.cache, key, DETAILS_CACHE_TTL, self.fetch_details(tmdb_id))
    }

    async fn discover_by_genre(
        &self,
        genre_id: u64,
        page: u32,
    ) -> AppResult<Vec<TmdbMovieSummary>> {
        let key = CacheKey::TmdbDiscover { genre_id, page };
        cached!(self.cache, key, SEARCH_CACHE_TTL, self.fetch_discover(genre_id, page))
    }

    fn name(&self) -> &'static str {
        "TMDB"
    }
}
