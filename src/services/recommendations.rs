use std::collections::HashSet;

use crate::{
    db::{CatalogStore, RecommendationSource, Store},
    error::AppResult,
    models::{DbId, MovieSummary},
};

/// Number of like-minded users consulted
pub const PEER_LIMIT: usize = 5;

/// Lowest peer score that counts as an endorsement
pub const PEER_MIN_SCORE: i16 = 7;

/// Movies to show on the home page and own profile
pub const PROFILE_RECOMMENDATIONS: usize = 12;

/// Movies on the dedicated recommendations page
pub const PAGE_RECOMMENDATIONS: usize = 24;

/// Generates personalized recommendations inside the featured genre
///
/// Two pools are combined:
/// - the best rated genre movies the user has not seen yet
/// - genre movies rated highly by users who rated the user's favorites
///
/// Movies the user favorited, rated or viewed are never returned. A user with
/// no activity inside the genre, or a missing genre, gets an empty list.
pub async fn recommend_for_user(
    store: &dyn Store,
    featured_genre: &str,
    user_id: DbId,
    limit: usize,
) -> AppResult<Vec<MovieSummary>> {
    if limit == 0 {
        return Ok(vec![]);
    }

    let Some(genre) = store.find_genre_by_name(featured_genre).await? else {
        tracing::debug!(genre = %featured_genre, "Featured genre missing, no recommendations");
        return Ok(vec![]);
    };

    let mut seen: HashSet<DbId> = HashSet::new();
    seen.extend(store.favorite_movie_ids(user_id).await?);
    seen.extend(store.rated_movie_ids(user_id).await?);
    seen.extend(store.viewed_movie_ids(user_id).await?);

    let seen_ids: Vec<DbId> = seen.iter().copied().collect();
    if store.filter_in_genre(genre.id, &seen_ids).await?.is_empty() {
        tracing::debug!(user_id, "No activity in featured genre, no recommendations");
        return Ok(vec![]);
    }

    // Each pool holds at most half the limit, rounded down
    let pool_size = limit / 2;

    let genre_pool = store.top_rated_in_genre(genre.id, &seen, pool_size).await?;

    let peers = store.similar_users(user_id, genre.id, PEER_LIMIT).await?;
    let peer_pool = if peers.is_empty() {
        vec![]
    } else {
        store
            .peer_favored_in_genre(genre.id, &peers, PEER_MIN_SCORE, &seen, pool_size)
            .await?
    };

    let recommendations = merge_pools(genre_pool, peer_pool, limit);

    tracing::info!(
        user_id,
        peers = peers.len(),
        count = recommendations.len(),
        "Generated recommendations"
    );

    Ok(recommendations)
}

/// Concatenates the pools, keeps the first occurrence of each movie and truncates
pub fn merge_pools(
    genre_pool: Vec<MovieSummary>,
    peer_pool: Vec<MovieSummary>,
    limit: usize,
) -> Vec<MovieSummary> {
    let mut ids = HashSet::new();
    genre_pool
        .into_iter()
        .chain(peer_pool)
        .filter(|movie| ids.insert(movie.id))
        .take(limit)
        .collect()
}
