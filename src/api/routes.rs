use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{
    self, accounts, catalog, engagement, lists, messaging, notifications, social, tmdb,
    watch_parties,
};
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/logout", post(accounts::logout))
        .route("/me", get(accounts::me))
        // Catalog
        .route("/home", get(catalog::home))
        .route("/genres", get(catalog::list_genres).post(catalog::create_genre))
        .route("/genres/:id/movies", get(catalog::genre_movies))
        .route("/catalog", get(catalog::browse_catalog))
        .route("/search", get(catalog::search))
        .route("/recommendations", get(catalog::recommended_movies))
        .route("/movies", post(catalog::create_movie))
        .route("/movies/:id", get(catalog::movie_detail))
        .route("/directors", post(catalog::create_director))
        .route("/actors", post(catalog::create_actor))
        // Ratings, reviews and personal lists
        .route("/movies/:id/rating", post(engagement::rate_movie))
        .route("/movies/:id/review", post(engagement::review_movie))
        .route("/movies/:id/favorite", post(engagement::toggle_favorite))
        .route("/movies/:id/watch-later", post(engagement::toggle_watch_later))
        // Custom lists
        .route("/lists", get(lists::my_lists).post(lists::create_list))
        .route("/lists/:id", get(lists::view_list).delete(lists::delete_list))
        .route("/lists/:id/movies", post(lists::add_movie))
        .route("/lists/:id/movies/:movie_id", delete(lists::remove_movie))
        // Social
        .route("/users", get(social::directory))
        .route("/users/:id", get(social::public_profile))
        .route(
            "/conversations",
            get(messaging::inbox).post(messaging::start_conversation),
        )
        .route("/conversations/:id", get(messaging::open_conversation))
        .route("/conversations/:id/messages", post(messaging::send_message))
        .route("/messages/unread", get(messaging::unread_messages))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread", get(notifications::unread_notifications))
        // Watch parties
        .route("/watch-parties", get(watch_parties::overview))
        .route("/movies/:id/watch-parties", post(watch_parties::create_party))
        .route("/watch-parties/code/:code", get(watch_parties::find_by_code))
        .route("/watch-parties/:id", get(watch_parties::party_detail))
        .route("/watch-parties/:id/join", post(watch_parties::join))
        .route("/watch-parties/:id/leave", post(watch_parties::leave))
        .route("/watch-parties/:id/messages", post(watch_parties::post_message))
        .route(
            "/watch-parties/:id/playback",
            get(watch_parties::playback).post(watch_parties::update_playback),
        )
        .route("/watch-parties/:id/start", post(watch_parties::start))
        .route("/watch-parties/:id/finish", post(watch_parties::finish))
        // TMDB import (staff)
        .route("/tmdb/search", get(tmdb::search))
        .route("/tmdb/popular", get(tmdb::popular))
        .route("/tmdb/import/:tmdb_id", post(tmdb::import_movie))
}
