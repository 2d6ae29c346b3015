use std::collections::{BTreeMap, HashSet};

use super::MemoryStore;
use crate::{
    db::RecommendationSource,
    error::AppResult,
    models::{DbId, MovieSummary},
};

#[async_trait::async_trait]
impl RecommendationSource for MemoryStore {
    async fn favorite_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .favorites
            .keys()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, movie)| *movie)
            .collect())
    }

    async fn rated_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ratings
            .keys()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, movie)| *movie)
            .collect())
    }

    async fn viewed_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .views
            .keys()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, movie)| *movie)
            .collect())
    }

    async fn filter_in_genre(&self, genre_id: DbId, movie_ids: &[DbId]) -> AppResult<Vec<DbId>> {
        let tables = self.tables.read().await;
        Ok(movie_ids
            .iter()
            .copied()
            .filter(|id| tables.in_genre(*id, genre_id))
            .collect())
    }

    async fn top_rated_in_genre(
        &self,
        genre_id: DbId,
        exclude: &HashSet<DbId>,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        let mut pool: Vec<MovieSummary> = tables
            .movies
            .values()
            .filter(|movie| movie.genre_ids.contains(&genre_id))
            .filter(|movie| !exclude.contains(&movie.id))
            .map(|movie| tables.summary(movie))
            .filter(|summary| summary.rating_count > 0)
            .collect();

        pool.sort_by(|a, b| {
            b.average_rating
                .partial_cmp(&a.average_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.rating_count.cmp(&a.rating_count))
                .then(a.id.cmp(&b.id))
        });
        pool.truncate(limit);
        Ok(pool)
    }

    async fn similar_users(
        &self,
        user_id: DbId,
        genre_id: DbId,
        limit: usize,
    ) -> AppResult<Vec<DbId>> {
        let tables = self.tables.read().await;
        let liked: HashSet<DbId> = tables
            .favorites
            .keys()
            .filter(|(user, movie)| *user == user_id && tables.in_genre(*movie, genre_id))
            .map(|(_, movie)| *movie)
            .collect();

        let mut matches: BTreeMap<DbId, usize> = BTreeMap::new();
        for (other, movie) in tables.ratings.keys() {
            if *other != user_id && liked.contains(movie) {
                *matches.entry(*other).or_default() += 1;
            }
        }

        let mut peers: Vec<(DbId, usize)> = matches.into_iter().collect();
        peers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(peers.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    async fn peer_favored_in_genre(
        &self,
        genre_id: DbId,
        peers: &[DbId],
        min_score: i16,
        exclude: &HashSet<DbId>,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        let peers: HashSet<DbId> = peers.iter().copied().collect();

        let mut qualifying: BTreeMap<DbId, (i64, i64)> = BTreeMap::new();
        for rating in tables.ratings.values() {
            if peers.contains(&rating.user_id)
                && rating.score >= min_score
                && !exclude.contains(&rating.movie_id)
                && tables.in_genre(rating.movie_id, genre_id)
            {
                let entry = qualifying.entry(rating.movie_id).or_default();
                entry.0 += rating.score as i64;
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<(DbId, f64)> = qualifying
            .into_iter()
            .map(|(movie, (sum, count))| (movie, sum as f64 / count as f64))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(tables.summaries(ranked.into_iter().take(limit).map(|(id, _)| id)))
    }
}
