use std::collections::HashSet;

use super::{rows::SummaryRow, PgStore};
use crate::{
    db::RecommendationSource,
    error::AppResult,
    models::{DbId, MovieSummary},
};

#[async_trait::async_trait]
impl RecommendationSource for PgStore {
    async fn favorite_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>> {
        let ids = sqlx::query_scalar("SELECT movie_id FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn rated_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>> {
        let ids = sqlx::query_scalar("SELECT movie_id FROM ratings WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn viewed_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>> {
        let ids = sqlx::query_scalar("SELECT movie_id FROM viewing_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn filter_in_genre(&self, genre_id: DbId, movie_ids: &[DbId]) -> AppResult<Vec<DbId>> {
        let ids = sqlx::query_scalar(
            "SELECT movie_id FROM movie_genres WHERE genre_id = $1 AND movie_id = ANY($2)",
        )
        .bind(genre_id)
        .bind(movie_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn top_rated_in_genre(
        &self,
        genre_id: DbId,
        exclude: &HashSet<DbId>,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        let excluded: Vec<DbId> = exclude.iter().copied().collect();
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.title, m.year, m.poster_url,
                   AVG(r.score)::float8 AS average_rating, COUNT(r.id) AS rating_count
            FROM movies m
            JOIN movie_genres mg ON mg.movie_id = m.id AND mg.genre_id = $1
            JOIN ratings r ON r.movie_id = m.id
            WHERE NOT (m.id = ANY($2))
            GROUP BY m.id
            ORDER BY average_rating DESC, rating_count DESC, m.id ASC
            LIMIT $3
            "#,
        )
        .bind(genre_id)
        .bind(excluded)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MovieSummary::from).collect())
    }

    async fn similar_users(
        &self,
        user_id: DbId,
        genre_id: DbId,
        limit: usize,
    ) -> AppResult<Vec<DbId>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT r.user_id
            FROM ratings r
            JOIN favorites f ON f.movie_id = r.movie_id AND f.user_id = $1
            JOIN movie_genres mg ON mg.movie_id = r.movie_id AND mg.genre_id = $2
            WHERE r.user_id <> $1
            GROUP BY r.user_id
            ORDER BY COUNT(*) DESC, r.user_id ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(genre_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn peer_favored_in_genre(
        &self,
        genre_id: DbId,
        peers: &[DbId],
        min_score: i16,
        exclude: &HashSet<DbId>,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>> {
        let excluded: Vec<DbId> = exclude.iter().copied().collect();
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.title, m.year, m.poster_url, s.average_rating, s.rating_count
            FROM (
                SELECT r.movie_id, AVG(r.score)::float8 AS peer_average
                FROM ratings r
                JOIN movie_genres mg ON mg.movie_id = r.movie_id AND mg.genre_id = $1
                WHERE r.user_id = ANY($2) AND r.score >= $3 AND NOT (r.movie_id = ANY($4))
                GROUP BY r.movie_id
            ) q
            JOIN movies m ON m.id = q.movie_id
            JOIN (
                SELECT movie_id, AVG(score)::float8 AS average_rating, COUNT(*) AS rating_count
                FROM ratings GROUP BY movie_id
            ) s ON s.movie_id = m.id
            ORDER BY q.peer_average DESC, m.id ASC
            LIMIT $5
            "#,
        )
        .bind(genre_id)
        .bind(peers.to_vec())
        .bind(min_score)
        .bind(excluded)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MovieSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        db::EngagementStore,
        models::{Genre, Score, User},
        services::{recommendations::recommend_for_user, test_support},
    };

    async fn connect() -> PgStore {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/cineclub_test".to_string());
        PgStore::connect(&database_url).await.unwrap()
    }

    /// Names are suffixed per run so tests can share one database
    struct Fixture {
        store: PgStore,
        suffix: String,
        genre: Genre,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = connect().await;
            let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
            let genre = test_support::genre(&store, &format!("Aventura-{}", suffix)).await;
            Self { store, suffix, genre }
        }

        async fn user(&self, name: &str) -> User {
            test_support::user(&self.store, &format!("{}-{}", name, self.suffix)).await
        }

        async fn movie(&self, title: &str) -> DbId {
            test_support::movie(
                &self.store,
                &format!("{} {}", title, self.suffix),
                vec![self.genre.id],
            )
            .await
            .id
        }

        async fn rate(&self, user: &User, movie: DbId, score: i64) {
            self.store
                .upsert_rating(user.id, movie, Score::try_from(score).unwrap())
                .await
                .unwrap();
        }

        async fn recommend(&self, user: &User, limit: usize) -> Vec<DbId> {
            recommend_for_user(&self.store, &self.genre.name, user.id, limit)
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.id)
                .collect()
        }
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database at DATABASE_URL"]
    async fn test_pg_excludes_seen_movies_and_merges_peer_pool() {
        let fx = Fixture::new().await;
        let favorite = fx.movie("Raiders").await;
        let rated = fx.movie("Temple").await;
        let viewed = fx.movie("Crusade").await;
        let top = fx.movie("Goonies").await;
        let peer_pick = fx.movie("Romancing").await;
        let unrated = fx.movie("Willow").await;

        let indy = fx.user("indy").await;
        let marion = fx.user("marion").await;

        fx.store.toggle_favorite(indy.id, favorite).await.unwrap();
        fx.rate(&indy, rated, 6).await;
        fx.store.record_view(indy.id, viewed).await.unwrap();

        fx.rate(&marion, favorite, 10).await;
        fx.rate(&marion, top, 9).await;
        fx.rate(&marion, rated, 9).await;
        fx.rate(&marion, viewed, 9).await;
        fx.rate(&marion, peer_pick, 7).await;

        let ids = fx.recommend(&indy, 12).await;
        assert_eq!(ids, vec![top, peer_pick]);
        assert!(!ids.contains(&unrated));
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database at DATABASE_URL"]
    async fn test_pg_top_rated_orders_by_mean_then_count() {
        let fx = Fixture::new().await;
        let excluded = fx.movie("Excluded").await;
        let single = fx.movie("Single").await;
        let double = fx.movie("Double").await;
        let lower = fx.movie("Lower").await;
        fx.movie("Unrated").await;

        let a = fx.user("a").await;
        let b = fx.user("b").await;
        fx.rate(&a, excluded, 10).await;
        fx.rate(&a, single, 9).await;
        fx.rate(&a, double, 9).await;
        fx.rate(&b, double, 9).await;
        fx.rate(&a, lower, 5).await;

        let exclude: HashSet<DbId> = [excluded].into_iter().collect();
        let pool = fx
            .store
            .top_rated_in_genre(fx.genre.id, &exclude, 10)
            .await
            .unwrap();
        let ids: Vec<DbId> = pool.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![double, single, lower]);
        assert_eq!(pool[0].rating_count, 2);

        // An empty exclusion set must not filter everything out
        let all = fx
            .store
            .top_rated_in_genre(fx.genre.id, &HashSet::new(), 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database at DATABASE_URL"]
    async fn test_pg_similar_users_ranked_by_matching_ratings() {
        let fx = Fixture::new().await;
        let first = fx.movie("First").await;
        let second = fx.movie("Second").await;

        let indy = fx.user("indy").await;
        let marion = fx.user("marion").await;
        let sallah = fx.user("sallah").await;
        fx.store.toggle_favorite(indy.id, first).await.unwrap();
        fx.store.toggle_favorite(indy.id, second).await.unwrap();
        fx.rate(&indy, first, 8).await;
        fx.rate(&sallah, first, 3).await;
        fx.rate(&marion, first, 9).await;
        fx.rate(&marion, second, 9).await;

        let peers = fx.store.similar_users(indy.id, fx.genre.id, 5).await.unwrap();
        assert_eq!(peers, vec![marion.id, sallah.id]);

        let top = fx.store.similar_users(indy.id, fx.genre.id, 1).await.unwrap();
        assert_eq!(top, vec![marion.id]);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database at DATABASE_URL"]
    async fn test_pg_peer_pool_ranks_by_qualifying_mean() {
        let fx = Fixture::new().await;
        let mixed = fx.movie("Mixed").await;
        let steady = fx.movie("Steady").await;
        let low = fx.movie("Low").await;

        let marion = fx.user("marion").await;
        let sallah = fx.user("sallah").await;
        // Qualifying mean 10 but overall mean 8
        fx.rate(&marion, mixed, 10).await;
        fx.rate(&sallah, mixed, 6).await;
        fx.rate(&marion, steady, 9).await;
        fx.rate(&sallah, steady, 9).await;
        fx.rate(&marion, low, 6).await;

        let pool = fx
            .store
            .peer_favored_in_genre(fx.genre.id, &[marion.id, sallah.id], 7, &HashSet::new(), 10)
            .await
            .unwrap();
        let ids: Vec<DbId> = pool.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![mixed, steady]);
        assert_eq!(pool[0].average_rating, Some(8.0));
        assert_eq!(pool[0].rating_count, 2);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database at DATABASE_URL"]
    async fn test_pg_recommendations_dedup_and_round_pools_down() {
        let fx = Fixture::new().await;
        let seed = fx.movie("Seed").await;
        let indy = fx.user("indy").await;
        let marion = fx.user("marion").await;
        fx.store.toggle_favorite(indy.id, seed).await.unwrap();
        fx.rate(&marion, seed, 9).await;

        let mut movies = Vec::new();
        for i in 0..6 {
            let movie = fx.movie(&format!("Movie {}", i)).await;
            fx.rate(&marion, movie, 8).await;
            movies.push(movie);
        }

        assert!(fx.recommend(&indy, 1).await.is_empty());

        let ids = fx.recommend(&indy, 4).await;
        assert_eq!(ids, vec![movies[0], movies[1]]);
        let unique: HashSet<DbId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
