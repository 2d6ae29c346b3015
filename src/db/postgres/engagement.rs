use super::{
    constraint_error,
    rows::{
        RatingRow, ReviewRow, SummaryRow, UpsertedRating, UpsertedReview, ViewingRow,
        SUMMARY_SELECT,
    },
    PgStore,
};
use crate::{
    db::EngagementStore,
    error::AppResult,
    models::{DbId, MovieSummary, Rating, Review, Score, Upserted, ViewingRecord},
};

const REVIEW_SELECT: &str = r#"
    SELECT v.id, v.movie_id, v.user_id, u.username AS author, v.title, v.body,
           v.helpful_count, v.created_at, v.updated_at
    FROM reviews v
    JOIN users u ON u.id = v.user_id
"#;

/// Tables holding a plain (user, movie) membership
#[derive(Clone, Copy)]
enum Membership {
    Favorites,
    WatchLater,
}

impl Membership {
    fn table(&self) -> &'static str {
        match self {
            Membership::Favorites => "favorites",
            Membership::WatchLater => "watch_later",
        }
    }
}

impl PgStore {
    async fn toggle_membership(
        &self,
        relation: Membership,
        user_id: DbId,
        movie_id: DbId,
    ) -> AppResult<bool> {
        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND movie_id = $2",
            relation.table()
        ))
        .bind(user_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;

        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(&format!(
            "INSERT INTO {} (user_id, movie_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            relation.table()
        ))
        .bind(user_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Movie"))?;

        Ok(true)
    }

    async fn membership_movies(
        &self,
        relation: Membership,
        user_id: DbId,
        limit: Option<u64>,
    ) -> AppResult<Vec<MovieSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            r#"
            {SUMMARY_SELECT}
            JOIN {table} rel ON rel.movie_id = m.id
            WHERE rel.user_id = $1
            ORDER BY rel.added_at DESC, m.id DESC
            LIMIT $2
            "#,
            table = relation.table()
        ))
        .bind(user_id)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MovieSummary::from).collect())
    }
}

#[async_trait::async_trait]
impl EngagementStore for PgStore {
    async fn upsert_rating(
        &self,
        user_id: DbId,
        movie_id: DbId,
        score: Score,
    ) -> AppResult<Upserted<Rating>> {
        let row: UpsertedRating = sqlx::query_as(
            r#"
            INSERT INTO ratings (movie_id, user_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (movie_id, user_id) DO UPDATE SET score = EXCLUDED.score
            RETURNING id, movie_id, user_id, score, created_at, (xmax = 0) AS created
            "#,
        )
        .bind(movie_id)
        .bind(user_id)
        .bind(score.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Rating"))?;
        Ok(row.into())
    }

    async fn find_rating(&self, user_id: DbId, movie_id: DbId) -> AppResult<Option<Rating>> {
        let row: Option<RatingRow> = sqlx::query_as(
            r#"
            SELECT id, movie_id, user_id, score, created_at
            FROM ratings WHERE user_id = $1 AND movie_id = $2
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Rating::from))
    }

    async fn user_ratings(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<Rating>> {
        let rows: Vec<RatingRow> = sqlx::query_as(
            r#"
            SELECT id, movie_id, user_id, score, created_at
            FROM ratings WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn upsert_review(
        &self,
        user_id: DbId,
        movie_id: DbId,
        title: &str,
        body: &str,
    ) -> AppResult<Upserted<Review>> {
        let row: UpsertedReview = sqlx::query_as(
            r#"
            WITH upserted AS (
                INSERT INTO reviews (movie_id, user_id, title, body)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (movie_id, user_id) DO UPDATE
                    SET title = EXCLUDED.title, body = EXCLUDED.body, updated_at = NOW()
                RETURNING *, (xmax = 0) AS created
            )
            SELECT up.id, up.movie_id, up.user_id, u.username AS author, up.title, up.body,
                   up.helpful_count, up.created_at, up.updated_at, up.created
            FROM upserted up
            JOIN users u ON u.id = up.user_id
            "#,
        )
        .bind(movie_id)
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Review"))?;
        Ok(row.into())
    }

    async fn movie_reviews(&self, movie_id: DbId, limit: u64) -> AppResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE v.movie_id = $1 ORDER BY v.created_at DESC, v.id DESC LIMIT $2"
        ))
        .bind(movie_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn count_reviews(&self, movie_id: DbId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE movie_id = $1")
            .bind(movie_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn user_reviews(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE v.user_id = $1 ORDER BY v.created_at DESC, v.id DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn toggle_favorite(&self, user_id: DbId, movie_id: DbId) -> AppResult<bool> {
        self.toggle_membership(Membership::Favorites, user_id, movie_id)
            .await
    }

    async fn toggle_watch_later(&self, user_id: DbId, movie_id: DbId) -> AppResult<bool> {
        self.toggle_membership(Membership::WatchLater, user_id, movie_id)
            .await
    }

    async fn favorites(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<MovieSummary>> {
        self.membership_movies(Membership::Favorites, user_id, limit)
            .await
    }

    async fn watch_later(&self, user_id: DbId) -> AppResult<Vec<MovieSummary>> {
        self.membership_movies(Membership::WatchLater, user_id, None)
            .await
    }

    async fn record_view(&self, user_id: DbId, movie_id: DbId) -> AppResult<Upserted<ViewingRecord>> {
        let inserted: Option<ViewingRow> = sqlx::query_as(
            r#"
            INSERT INTO viewing_history (user_id, movie_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, movie_id) DO NOTHING
            RETURNING id, user_id, movie_id, viewed_at, minutes_watched, completed
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Viewing record"))?;

        if let Some(row) = inserted {
            return Ok(Upserted {
                record: row.into(),
                created: true,
            });
        }

        let existing: ViewingRow = sqlx::query_as(
            r#"
            SELECT id, user_id, movie_id, viewed_at, minutes_watched, completed
            FROM viewing_history WHERE user_id = $1 AND movie_id = $2
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Upserted {
            record: existing.into(),
            created: false,
        })
    }
}
