use axum::{http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

pub mod accounts;
pub mod catalog;
pub mod engagement;
pub mod lists;
pub mod messaging;
pub mod notifications;
pub mod social;
pub mod tmdb;
pub mod watch_parties;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `?page=` kept raw so malformed values fall back to the first page and out-of-range numbers to the last
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?q=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
}
