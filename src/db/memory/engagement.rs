use chrono::Utc;
use std::collections::BTreeMap;

use super::{MemoryStore, Tables};
use crate::{
    db::EngagementStore,
    error::{AppError, AppResult},
    models::{DbId, MovieSummary, Rating, Review, Score, Upserted, ViewingRecord},
};

impl Tables {
    fn require_movie(&self, movie_id: DbId) -> AppResult<()> {
        if self.movies.contains_key(&movie_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Movie {} not found", movie_id)))
        }
    }

    fn with_author(&self, review: &Review) -> Review {
        Review {
            author: self.username(review.user_id),
            ..review.clone()
        }
    }

    /// Toggles membership of `(user, movie)` and returns the new state
    fn toggle(
        relation: &mut BTreeMap<(DbId, DbId), chrono::DateTime<Utc>>,
        user_id: DbId,
        movie_id: DbId,
    ) -> bool {
        if relation.remove(&(user_id, movie_id)).is_some() {
            false
        } else {
            relation.insert((user_id, movie_id), Utc::now());
            true
        }
    }

    /// Movies of a user's relation, most recently added first
    fn relation_movies(
        &self,
        relation: &BTreeMap<(DbId, DbId), chrono::DateTime<Utc>>,
        user_id: DbId,
        limit: Option<u64>,
    ) -> Vec<MovieSummary> {
        let mut entries: Vec<_> = relation
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .map(|((_, movie), added)| (*movie, *added))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

        let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        self.summaries(entries.into_iter().take(limit).map(|(movie, _)| movie))
    }
}

#[async_trait::async_trait]
impl EngagementStore for MemoryStore {
    async fn upsert_rating(
        &self,
        user_id: DbId,
        movie_id: DbId,
        score: Score,
    ) -> AppResult<Upserted<Rating>> {
        let mut tables = self.tables.write().await;
        tables.require_movie(movie_id)?;

        if let Some(existing) = tables.ratings.get_mut(&(user_id, movie_id)) {
            existing.score = score.value();
            return Ok(Upserted {
                record: existing.clone(),
                created: false,
            });
        }

        let rating = Rating {
            id: tables.next_id(),
            movie_id,
            user_id,
            score: score.value(),
            created_at: Utc::now(),
        };
        tables.ratings.insert((user_id, movie_id), rating.clone());
        Ok(Upserted {
            record: rating,
            created: true,
        })
    }

    async fn find_rating(&self, user_id: DbId, movie_id: DbId) -> AppResult<Option<Rating>> {
        let tables = self.tables.read().await;
        Ok(tables.ratings.get(&(user_id, movie_id)).cloned())
    }

    async fn user_ratings(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<Rating>> {
        let tables = self.tables.read().await;
        let mut ratings: Vec<Rating> = tables
            .ratings
            .values()
            .filter(|rating| rating.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        ratings.truncate(limit.map(|l| l as usize).unwrap_or(usize::MAX));
        Ok(ratings)
    }

    async fn upsert_review(
        &self,
        user_id: DbId,
        movie_id: DbId,
        title: &str,
        body: &str,
    ) -> AppResult<Upserted<Review>> {
        let mut tables = self.tables.write().await;
        tables.require_movie(movie_id)?;
        let now = Utc::now();

        if let Some(existing) = tables.reviews.get_mut(&(user_id, movie_id)) {
            existing.title = title.to_string();
            existing.body = body.to_string();
            existing.updated_at = now;
            let existing = existing.clone();
            return Ok(Upserted {
                record: tables.with_author(&existing),
                created: false,
            });
        }

        let review = Review {
            id: tables.next_id(),
            movie_id,
            user_id,
            author: String::new(),
            title: title.to_string(),
            body: body.to_string(),
            helpful_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert((user_id, movie_id), review.clone());
        Ok(Upserted {
            record: tables.with_author(&review),
            created: true,
        })
    }

    async fn movie_reviews(&self, movie_id: DbId, limit: u64) -> AppResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|review| review.movie_id == movie_id)
            .map(|review| tables.with_author(review))
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews.truncate(limit as usize);
        Ok(reviews)
    }

    async fn count_reviews(&self, movie_id: DbId) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|review| review.movie_id == movie_id)
            .count() as i64)
    }

    async fn user_reviews(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|review| review.user_id == user_id)
            .map(|review| tables.with_author(review))
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews.truncate(limit.map(|l| l as usize).unwrap_or(usize::MAX));
        Ok(reviews)
    }

    async fn toggle_favorite(&self, user_id: DbId, movie_id: DbId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        tables.require_movie(movie_id)?;
        Ok(Tables::toggle(&mut tables.favorites, user_id, movie_id))
    }

    async fn toggle_watch_later(&self, user_id: DbId, movie_id: DbId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        tables.require_movie(movie_id)?;
        Ok(Tables::toggle(&mut tables.watch_later, user_id, movie_id))
    }

    async fn favorites(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        Ok(tables.relation_movies(&tables.favorites, user_id, limit))
    }

    async fn watch_later(&self, user_id: DbId) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        Ok(tables.relation_movies(&tables.watch_later, user_id, None))
    }

    async fn record_view(&self, user_id: DbId, movie_id: DbId) -> AppResult<Upserted<ViewingRecord>> {
        let mut tables = self.tables.write().await;
        tables.require_movie(movie_id)?;

        if let Some(existing) = tables.views.get(&(user_id, movie_id)) {
            return Ok(Upserted {
                record: existing.clone(),
                created: false,
            });
        }

        let record = ViewingRecord {
            id: tables.next_id(),
            user_id,
            movie_id,
            viewed_at: Utc::now(),
            minutes_watched: 0,
            completed: false,
        };
        tables.views.insert((user_id, movie_id), record.clone());
        Ok(Upserted {
            record,
            created: true,
        })
    }
}
