use serde::Deserialize;

use crate::{
    db::{EngagementStore, Store},
    error::AppResult,
    models::{DbId, Rating, Review, Score, Upserted},
    services::{catalog::require_movie, required_text},
};

const MAX_REVIEW_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct RatingForm {
    pub score: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewForm {
    pub title: String,
    pub body: String,
}

/// Creates or replaces the user's rating; out-of-range scores never reach the store
pub async fn rate_movie(
    store: &dyn Store,
    user_id: DbId,
    movie_id: DbId,
    form: RatingForm,
) -> AppResult<Upserted<Rating>> {
    let score = Score::try_from(form.score)?;
    require_movie(store, movie_id).await?;

    let rating = store.upsert_rating(user_id, movie_id, score).await?;
    tracing::info!(
        user_id,
        movie_id,
        score = score.value(),
        created = rating.created,
        "Saved rating"
    );
    Ok(rating)
}

/// Creates or replaces the user's review
pub async fn review_movie(
    store: &dyn Store,
    user_id: DbId,
    movie_id: DbId,
    form: ReviewForm,
) -> AppResult<Upserted<Review>> {
    let title = required_text("Title", &form.title, Some(MAX_REVIEW_TITLE_LEN))?;
    let body = required_text("Review", &form.body, None)?;
    require_movie(store, movie_id).await?;

    let review = store.upsert_review(user_id, movie_id, &title, &body).await?;
    tracing::info!(user_id, movie_id, created = review.created, "Saved review");
    Ok(review)
}

pub async fn toggle_favorite(store: &dyn Store, user_id: DbId, movie_id: DbId) -> AppResult<bool> {
    require_movie(store, movie_id).await?;
    let favorited = store.toggle_favorite(user_id, movie_id).await?;
    tracing::info!(user_id, movie_id, favorited, "Toggled favorite");
    Ok(favorited)
}

pub async fn toggle_watch_later(
    store: &dyn Store,
    user_id: DbId,
    movie_id: DbId,
) -> AppResult<bool> {
    require_movie(store, movie_id).await?;
    let watch_later = store.toggle_watch_later(user_id, movie_id).await?;
    tracing::info!(user_id, movie_id, watch_later, "Toggled watch later");
    Ok(watch_later)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{CatalogStore, MemoryStore},
        error::AppError,
        services::test_support,
    };

    async fn setup() -> (MemoryStore, DbId, DbId) {
        let store = MemoryStore::new();
        let genre = test_support::genre(&store, "Aventura").await;
        let movie = test_support::movie(&store, "Hook", vec![genre.id]).await;
        let user = test_support::user(&store, "indy").await;
        (store, user.id, movie.id)
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_not_stored() {
        let (store, user_id, movie_id) = setup().await;

        for score in [0, 11, -1] {
            let result = rate_movie(&store, user_id, movie_id, RatingForm { score }).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
        assert_eq!(store.rating_stats(movie_id).await.unwrap(), (None, 0));
    }

    #[tokio::test]
    async fn test_second_rating_updates_first() {
        let (store, user_id, movie_id) = setup().await;

        let first = rate_movie(&store, user_id, movie_id, RatingForm { score: 4 })
            .await
            .unwrap();
        let second = rate_movie(&store, user_id, movie_id, RatingForm { score: 9 })
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.record.score, 9);
        assert_eq!(store.rating_stats(movie_id).await.unwrap(), (Some(9.0), 1));
    }

    #[tokio::test]
    async fn test_rating_unknown_movie() {
        let (store, user_id, _) = setup().await;
        let result = rate_movie(&store, user_id, 999, RatingForm { score: 5 }).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_review_requires_title_and_body() {
        let (store, user_id, movie_id) = setup().await;

        let blank = ReviewForm {
            title: " ".to_string(),
            body: "Great".to_string(),
        };
        assert!(review_movie(&store, user_id, movie_id, blank).await.is_err());

        let form = ReviewForm {
            title: "Bangarang".to_string(),
            body: "Peter Pan grows up".to_string(),
        };
        let review = review_movie(&store, user_id, movie_id, form.clone())
            .await
            .unwrap();
        assert!(review.created);
        assert_eq!(review.record.author, "indy");

        let again = review_movie(&store, user_id, movie_id, form).await.unwrap();
        assert!(!again.created);
        assert_eq!(store.count_reviews(movie_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_toggles_flip() {
        let (store, user_id, movie_id) = setup().await;
        assert!(toggle_favorite(&store, user_id, movie_id).await.unwrap());
        assert!(!toggle_favorite(&store, user_id, movie_id).await.unwrap());
        assert!(toggle_watch_later(&store, user_id, movie_id).await.unwrap());
    }
}
