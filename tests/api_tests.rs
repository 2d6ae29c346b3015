use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use cineclub_api::{
    api::{create_router, AppState},
    config::Config,
    db::MemoryStore,
    error::{AppError, AppResult},
    models::{
        tmdb::{TmdbCastMember, TmdbCredits, TmdbCrewMember, TmdbGenre},
        TmdbMovieDetails, TmdbMovieSummary,
    },
    services::MovieCatalogProvider,
};

/// In-process stand-in for TMDB
struct FakeCatalog {
    available: bool,
}

#[async_trait]
impl MovieCatalogProvider for FakeCatalog {
    async fn search_movies(&self, query: &str, _page: u32) -> AppResult<Vec<TmdbMovieSummary>> {
        if !self.available {
            return Err(AppError::ExternalApi("TMDB is down".to_string()));
        }
        Ok(vec![summary(550, &format!("{} result", query))])
    }

    async fn movie_details(&self, tmdb_id: u64) -> AppResult<TmdbMovieDetails> {
        if !self.available {
            return Err(AppError::ExternalApi("TMDB is down".to_string()));
        }
        Ok(TmdbMovieDetails {
            id: tmdb_id,
            title: Some("Jumanji".to_string()),
            release_date: Some("1995-12-15".to_string()),
            runtime: Some(104),
            genres: vec![TmdbGenre {
                id: 12,
                name: "Aventura".to_string(),
            }],
            credits: Some(TmdbCredits {
                cast: vec![TmdbCastMember {
                    name: "Robin Williams".to_string(),
                }],
                crew: vec![TmdbCrewMember {
                    name: "Joe Johnston".to_string(),
                    job: "Director".to_string(),
                }],
            }),
            ..Default::default()
        })
    }

    async fn discover_by_genre(
        &self,
        _genre_id: u64,
        page: u32,
    ) -> AppResult<Vec<TmdbMovieSummary>> {
        if !self.available {
            return Err(AppError::ExternalApi("TMDB is down".to_string()));
        }
        Ok(vec![summary(100 + page as u64, "Popular")])
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn summary(id: u64, title: &str) -> TmdbMovieSummary {
    TmdbMovieSummary {
        id,
        title: title.to_string(),
        original_title: None,
        overview: None,
        release_date: None,
        poster_path: None,
        popularity: None,
        vote_average: None,
        genre_ids: vec![12],
    }
}

fn create_test_server_with(available: bool) -> TestServer {
    let config = Config {
        staff_usernames: vec!["staff".to_string()],
        ..Config::default()
    };
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(FakeCatalog { available }),
        config,
    );
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    create_test_server_with(true)
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn error_message(response: &TestResponse) -> String {
    let body: Value = response.json();
    body["error"].as_str().unwrap_or_default().to_string()
}

/// Registers an account and returns (user id, session token)
async fn register(server: &TestServer, username: &str) -> (i64, String) {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "first_name": "Test",
            "last_name": username,
            "password": "correct horse",
            "password_confirmation": "correct horse",
            "accept_terms": true
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    (
        body["user"]["id"].as_i64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

async fn create_genre(server: &TestServer, staff: &str, name: &str) -> i64 {
    let response = server
        .post("/api/v1/genres")
        .add_header(header::AUTHORIZATION, bearer(staff))
        .json(&json!({ "name": name, "description": "" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn create_movie(server: &TestServer, staff: &str, title: &str, genre_id: i64) -> i64 {
    let response = server
        .post("/api/v1/movies")
        .add_header(header::AUTHORIZATION, bearer(staff))
        .json(&json!({
            "title": title,
            "synopsis": "A synopsis",
            "year": 2001,
            "duration_minutes": 120,
            "country": "México",
            "language": "ES",
            "release_date": "2001-06-01",
            "genre_ids": [genre_id]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn rate(server: &TestServer, token: &str, movie_id: i64, score: i64) -> TestResponse {
    server
        .post(&format!("/api/v1/movies/{}/rating", movie_id))
        .add_header(header::AUTHORIZATION, bearer(token))
        .json(&json!({ "score": score }))
        .await
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let response = server
        .get("/health")
        .add_header(
            header::HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-123");
}

#[tokio::test]
async fn test_register_login_logout() {
    let server = create_test_server();
    let (user_id, token) = register(&server, "ana").await;

    let me = server
        .get("/api/v1/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    me.assert_status_ok();
    let profile: Value = me.json();
    assert_eq!(profile["user"]["id"], user_id);
    assert_eq!(profile["profile"]["accepted_terms"], true);
    assert!(profile["user"].get("password_hash").is_none());

    let wrong = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "ana", "password": "nope nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "ana", "password": "correct horse" }))
        .await;
    login.assert_status_ok();
    let fresh = login.json::<Value>()["token"].as_str().unwrap().to_string();

    server
        .post("/api/v1/auth/logout")
        .add_header(header::AUTHORIZATION, bearer(&fresh))
        .await
        .assert_status_ok();
    server
        .get("/api/v1/me")
        .add_header(header::AUTHORIZATION, bearer(&fresh))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let server = create_test_server();
    register(&server, "ana").await;

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": "ana",
            "email": "other@example.com",
            "first_name": "Ana",
            "last_name": "Two",
            "password": "correct horse",
            "password_confirmation": "correct horse",
            "accept_terms": true
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_requires_terms() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": "ana",
            "email": "ana@example.com",
            "first_name": "Ana",
            "last_name": "Pérez",
            "password": "correct horse",
            "password_confirmation": "correct horse",
            "accept_terms": false
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_endpoints_reject_regular_users() {
    let server = create_test_server();
    let (_, token) = register(&server, "ana").await;

    server
        .post("/api/v1/genres")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "Aventura" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get("/api/v1/tmdb/search?q=jumanji")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get("/api/v1/tmdb/search?q=jumanji")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rating_range_and_upsert() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;
    let (_, ana) = register(&server, "ana").await;
    let genre = create_genre(&server, &staff, "Aventura").await;
    let movie = create_movie(&server, &staff, "Jumanji", genre).await;

    let too_high = rate(&server, &ana, movie, 11).await;
    too_high.assert_status(StatusCode::BAD_REQUEST);
    assert!(error_message(&too_high).contains("between 1 and 10"));
    rate(&server, &ana, movie, 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let first: Value = rate(&server, &ana, movie, 7).await.json();
    assert_eq!(first["created"], true);
    let second: Value = rate(&server, &ana, movie, 9).await.json();
    assert_eq!(second["created"], false);
    assert_eq!(second["record"]["score"], 9);

    let detail: Value = server
        .get(&format!("/api/v1/movies/{}", movie))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    assert_eq!(detail["rating_count"], 1);
    assert_eq!(detail["user_rating"]["score"], 9);
}

#[tokio::test]
async fn test_unknown_movie_is_not_found() {
    let server = create_test_server();
    let response = server.get("/api/v1/movies/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(!error_message(&response).is_empty());
}

#[tokio::test]
async fn test_favorite_toggles() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;
    let genre = create_genre(&server, &staff, "Aventura").await;
    let movie = create_movie(&server, &staff, "Hook", genre).await;
    let path = format!("/api/v1/movies/{}/favorite", movie);

    let on: Value = server
        .post(&path)
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .json();
    assert_eq!(on["favorited"], true);
    let off: Value = server
        .post(&path)
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .json();
    assert_eq!(off["favorited"], false);
}

#[tokio::test]
async fn test_catalog_only_lists_featured_genre() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;
    let adventure = create_genre(&server, &staff, "Aventura").await;
    let drama = create_genre(&server, &staff, "Drama").await;
    create_movie(&server, &staff, "Jumanji", adventure).await;
    create_movie(&server, &staff, "Roma", drama).await;

    let catalog: Value = server.get("/api/v1/catalog?page=abc").await.json();
    let titles: Vec<&str> = catalog["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Jumanji"]);
    assert_eq!(catalog["page"], 1);

    server
        .get(&format!("/api/v1/genres/{}/movies", drama))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get(&format!("/api/v1/genres/{}/movies", adventure))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_recommendations_skip_seen_movies() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;
    let (_, ana) = register(&server, "ana").await;
    let (_, bea) = register(&server, "bea").await;
    let adventure = create_genre(&server, &staff, "Aventura").await;
    let drama = create_genre(&server, &staff, "Drama").await;

    let seen = create_movie(&server, &staff, "Jumanji", adventure).await;
    let hook = create_movie(&server, &staff, "Hook", adventure).await;
    let goonies = create_movie(&server, &staff, "The Goonies", adventure).await;
    let roma = create_movie(&server, &staff, "Roma", drama).await;

    // Without featured-genre activity there is nothing to recommend
    let empty: Vec<Value> = server
        .get("/api/v1/recommendations")
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    assert!(empty.is_empty());

    rate(&server, &ana, seen, 9).await.assert_status_ok();
    rate(&server, &bea, seen, 9).await.assert_status_ok();
    rate(&server, &bea, hook, 8).await.assert_status_ok();
    rate(&server, &bea, roma, 10).await.assert_status_ok();

    let recommended: Vec<Value> = server
        .get("/api/v1/recommendations")
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    let ids: Vec<i64> = recommended
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();

    assert!(!ids.is_empty());
    assert!(!ids.contains(&seen));
    assert!(!ids.contains(&roma));
    assert!(ids.contains(&hook));
    assert!(ids.iter().all(|id| *id == hook || *id == goonies));
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn test_watch_party_capacity_and_host_controls() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;
    let (_, ana) = register(&server, "ana").await;
    let (_, bea) = register(&server, "bea").await;
    let genre = create_genre(&server, &staff, "Aventura").await;
    let movie = create_movie(&server, &staff, "Jumanji", genre).await;

    let past = server
        .post(&format!("/api/v1/movies/{}/watch-parties", movie))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({
            "name": "Too late",
            "scheduled_for": Utc::now() - Duration::hours(1),
            "max_participants": 2
        }))
        .await;
    past.assert_status(StatusCode::BAD_REQUEST);

    let created = server
        .post(&format!("/api/v1/movies/{}/watch-parties", movie))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({
            "name": "Friday night",
            "scheduled_for": Utc::now() + Duration::days(1),
            "public": true,
            "max_participants": 2
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let party: Value = created.json();
    let party_id = party["id"].as_i64().unwrap();
    let code = party["invite_code"].as_str().unwrap().to_lowercase();

    let by_code: Value = server
        .get(&format!("/api/v1/watch-parties/code/{}", code))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    assert_eq!(by_code["id"], party_id);

    let joined: Value = server
        .post(&format!("/api/v1/watch-parties/{}/join", party_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    assert_eq!(joined["outcome"], "joined");

    server
        .post(&format!("/api/v1/watch-parties/{}/join", party_id))
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .await
        .assert_status(StatusCode::CONFLICT);

    let again: Value = server
        .post(&format!("/api/v1/watch-parties/{}/join", party_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    assert_eq!(again["outcome"], "already_participant");

    server
        .post(&format!("/api/v1/watch-parties/{}/messages", party_id))
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .json(&json!({ "body": "let me in" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .post(&format!("/api/v1/watch-parties/{}/playback", party_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .json(&json!({ "position_seconds": 30, "playing": true }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .post(&format!("/api/v1/watch-parties/{}/playback", party_id))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "position_seconds": 30, "playing": true }))
        .await
        .assert_status_ok();

    let playback: Value = server
        .get(&format!("/api/v1/watch-parties/{}/playback", party_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .json();
    assert_eq!(playback["position_seconds"], 30);
    assert_eq!(playback["playing"], true);

    // The host hears about the new guest
    let unread: Value = server
        .get("/api/v1/notifications/unread")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .json();
    assert_eq!(unread["count"], 1);
    assert_eq!(unread["notifications"][0]["kind"], "watch_party");
}

#[tokio::test]
async fn test_private_messages_and_notifications() {
    let server = create_test_server();
    let (_, ana) = register(&server, "ana").await;
    let (bea_id, bea) = register(&server, "bea").await;
    let (_, cris) = register(&server, "cris").await;

    let started = server
        .post("/api/v1/conversations")
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .json(&json!({ "user_id": bea_id }))
        .await;
    started.assert_status(StatusCode::CREATED);
    let conversation_id = started.json::<Value>()["conversation"]["id"]
        .as_i64()
        .unwrap();

    let reused = server
        .post("/api/v1/conversations")
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .json(&json!({ "user_id": bea_id }))
        .await;
    reused.assert_status_ok();
    assert_eq!(reused.json::<Value>()["conversation"]["id"], conversation_id);

    server
        .post(&format!("/api/v1/conversations/{}/messages", conversation_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .json(&json!({ "body": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post(&format!("/api/v1/conversations/{}/messages", conversation_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .json(&json!({ "body": "¿Vemos Jumanji?" }))
        .await
        .assert_status(StatusCode::CREATED);

    let unread: Value = server
        .get("/api/v1/messages/unread")
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .await
        .json();
    assert_eq!(unread["total_unread"], 1);

    server
        .get(&format!("/api/v1/conversations/{}", conversation_id))
        .add_header(header::AUTHORIZATION, bearer(&cris))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .get(&format!("/api/v1/conversations/{}", conversation_id))
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .await
        .assert_status_ok();
    let after: Value = server
        .get("/api/v1/messages/unread")
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .await
        .json();
    assert_eq!(after["total_unread"], 0);

    let notifications: Vec<Value> = server
        .get("/api/v1/notifications")
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .await
        .json();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["kind"], "message");

    let polled: Value = server
        .get("/api/v1/notifications/unread")
        .add_header(header::AUTHORIZATION, bearer(&bea))
        .await
        .json();
    assert_eq!(polled["count"], 0);
}

#[tokio::test]
async fn test_private_list_is_hidden_from_others() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;
    let (_, ana) = register(&server, "ana").await;
    let genre = create_genre(&server, &staff, "Aventura").await;
    let movie = create_movie(&server, &staff, "Jumanji", genre).await;

    let created = server
        .post("/api/v1/lists")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "Pendientes" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let list_id = created.json::<Value>()["id"].as_i64().unwrap();

    server
        .post(&format!("/api/v1/lists/{}/movies", list_id))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .json(&json!({ "movie_id": movie }))
        .await
        .assert_status_ok();

    let own: Value = server
        .get(&format!("/api/v1/lists/{}", list_id))
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .json();
    assert_eq!(own["movies"].as_array().unwrap().len(), 1);

    server
        .get(&format!("/api/v1/lists/{}", list_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/api/v1/lists/{}", list_id))
        .add_header(header::AUTHORIZATION, bearer(&ana))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tmdb_import_and_duplicate() {
    let server = create_test_server();
    let (_, staff) = register(&server, "staff").await;

    let results: Vec<Value> = server
        .get("/api/v1/tmdb/search?q=jumanji")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .json();
    assert_eq!(results.len(), 1);

    let blank: Vec<Value> = server
        .get("/api/v1/tmdb/search?q=%20")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .json();
    assert!(blank.is_empty());

    let imported = server
        .post("/api/v1/tmdb/import/8844")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    imported.assert_status(StatusCode::CREATED);
    let movie: Value = imported.json();
    assert_eq!(movie["title"], "Jumanji");
    assert_eq!(movie["year"], 1995);
    assert_eq!(movie["classification"], "PG-13");

    server
        .post("/api/v1/tmdb/import/8844")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .assert_status(StatusCode::CONFLICT);

    // The imported genre makes the movie show up in the catalog
    let catalog: Value = server.get("/api/v1/catalog").await.json();
    assert_eq!(catalog["items"][0]["title"], "Jumanji");
}

#[tokio::test]
async fn test_tmdb_outage_degrades() {
    let server = create_test_server_with(false);
    let (_, staff) = register(&server, "staff").await;

    let popular = server
        .get("/api/v1/tmdb/popular?page=2")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await;
    popular.assert_status_ok();
    assert!(popular.json::<Vec<Value>>().is_empty());

    server
        .post("/api/v1/tmdb/import/8844")
        .add_header(header::AUTHORIZATION, bearer(&staff))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}
