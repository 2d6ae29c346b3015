use serde::Serialize;

use crate::{
    config::Config,
    db::{AccountStore, EngagementStore, SocialStore, Store},
    error::{AppError, AppResult},
    models::{
        DbId, MovieSummary, Page, PageWindow, Profile, PublicUser, Rating, Review, User,
        UserActivity,
    },
    services::recommendations::{recommend_for_user, PROFILE_RECOMMENDATIONS},
};

/// Users per social hub page
pub const PER_PAGE: u32 = 12;

const PUBLIC_FAVORITES: u64 = 12;
const PUBLIC_RATINGS: u64 = 10;
const PUBLIC_REVIEWS: u64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct SocialHub {
    pub users: Page<UserActivity>,
    /// Registered users other than the viewer
    pub total_users: u64,
}

/// Another user's profile as seen by the viewer
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub user: PublicUser,
    pub favorites: Vec<MovieSummary>,
    pub ratings: Vec<Rating>,
    pub reviews: Vec<Review>,
    pub conversation_id: Option<DbId>,
}

/// The signed-in user's own profile page
#[derive(Debug, Clone, Serialize)]
pub struct OwnProfile {
    pub user: User,
    pub profile: Profile,
    pub favorites: Vec<MovieSummary>,
    pub watch_later: Vec<MovieSummary>,
    pub ratings: Vec<Rating>,
    pub reviews: Vec<Review>,
    pub recommendations: Vec<MovieSummary>,
}

/// Other users, most active raters first
pub async fn directory(
    store: &dyn Store,
    viewer_id: DbId,
    query: Option<&str>,
    page: Option<&str>,
) -> AppResult<SocialHub> {
    let text = query.map(str::trim).filter(|q| !q.is_empty());

    let matching = store.count_user_directory(viewer_id, text).await?;
    let window = PageWindow::resolve(page, matching, PER_PAGE);
    let users = store
        .user_directory(viewer_id, text, window.limit(), window.offset())
        .await?;
    let total_users = store.count_users().await?.saturating_sub(1);

    Ok(SocialHub {
        users: window.into_page(users),
        total_users,
    })
}

pub async fn public_profile(
    store: &dyn Store,
    viewer_id: DbId,
    user_id: DbId,
) -> AppResult<PublicProfile> {
    if viewer_id == user_id {
        return Err(AppError::InvalidInput(
            "Use /api/v1/me to see your own profile".to_string(),
        ));
    }

    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    let conversation_id = store
        .find_direct_conversation(viewer_id, user_id)
        .await?
        .map(|conversation| conversation.id);

    Ok(PublicProfile {
        user: PublicUser::from(&user),
        favorites: store.favorites(user.id, Some(PUBLIC_FAVORITES)).await?,
        ratings: store.user_ratings(user.id, Some(PUBLIC_RATINGS)).await?,
        reviews: store.user_reviews(user.id, Some(PUBLIC_REVIEWS)).await?,
        conversation_id,
    })
}

pub async fn own_profile(store: &dyn Store, config: &Config, user: User) -> AppResult<OwnProfile> {
    let profile = store.ensure_profile(user.id).await?;
    let recommendations =
        recommend_for_user(store, &config.featured_genre, user.id, PROFILE_RECOMMENDATIONS)
            .await?;

    Ok(OwnProfile {
        favorites: store.favorites(user.id, None).await?,
        watch_later: store.watch_later(user.id).await?,
        ratings: store.user_ratings(user.id, None).await?,
        reviews: store.user_reviews(user.id, None).await?,
        recommendations,
        profile,
        user,
    })
}
