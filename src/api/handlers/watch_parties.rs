use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::{auth::CurrentUser, AppState},
    error::AppResult,
    models::{DbId, JoinOutcome, PartyChatMessage, PlaybackUpdate, WatchParty},
    services::watch_parties::{self, PartyDetail, PartyForm, PartyOverview, PlaybackState},
};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub body: String,
}

pub async fn overview(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<PartyOverview>> {
    Ok(Json(
        watch_parties::overview(state.store.as_ref(), current.user.id).await?,
    ))
}

pub async fn create_party(
    State(state): State<AppState>,
    Path(movie_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<PartyForm>,
) -> AppResult<(StatusCode, Json<WatchParty>)> {
    let party =
        watch_parties::create_party(state.store.as_ref(), current.user.id, movie_id, request)
            .await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn party_detail(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<PartyDetail>> {
    let detail =
        watch_parties::party_detail(state.store.as_ref(), party_id, current.user.id).await?;
    Ok(Json(detail))
}

pub async fn find_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    _current: CurrentUser,
) -> AppResult<Json<WatchParty>> {
    Ok(Json(
        watch_parties::find_by_code(state.store.as_ref(), &code).await?,
    ))
}

pub async fn join(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<Value>> {
    let outcome: JoinOutcome =
        watch_parties::join(state.store.as_ref(), party_id, &current.user).await?;
    Ok(Json(json!({ "outcome": outcome })))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<Value>> {
    let left = watch_parties::leave(state.store.as_ref(), party_id, current.user.id).await?;
    Ok(Json(json!({ "left": left })))
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<ChatRequest>,
) -> AppResult<(StatusCode, Json<PartyChatMessage>)> {
    let message = watch_parties::post_message(
        state.store.as_ref(),
        party_id,
        current.user.id,
        &request.body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn playback(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    _current: CurrentUser,
) -> AppResult<Json<PlaybackState>> {
    Ok(Json(
        watch_parties::playback(state.store.as_ref(), party_id).await?,
    ))
}

pub async fn update_playback(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<PlaybackUpdate>,
) -> AppResult<Json<PlaybackState>> {
    let playback =
        watch_parties::update_playback(state.store.as_ref(), party_id, current.user.id, request)
            .await?;
    Ok(Json(playback))
}

pub async fn start(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<WatchParty>> {
    Ok(Json(
        watch_parties::start(state.store.as_ref(), party_id, current.user.id).await?,
    ))
}

pub async fn finish(
    State(state): State<AppState>,
    Path(party_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<WatchParty>> {
    Ok(Json(
        watch_parties::finish(state.store.as_ref(), party_id, current.user.id).await?,
    ))
}
