use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{auth::CurrentUser, AppState},
    error::AppResult,
    models::{DbId, Message},
    services::messaging::{self, ConversationView, Inbox, StartedConversation, UnreadMessages},
};

#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub user_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub body: String,
}

pub async fn inbox(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Inbox>> {
    Ok(Json(messaging::inbox(state.store.as_ref(), current.user.id).await?))
}

/// 201 when a new conversation was opened, 200 when an existing one is reused
pub async fn start_conversation(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<StartConversationRequest>,
) -> AppResult<(StatusCode, Json<StartedConversation>)> {
    let started =
        messaging::start_conversation(state.store.as_ref(), current.user.id, request.user_id)
            .await?;
    let status = if started.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(started)))
}

pub async fn open_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    current: CurrentUser,
) -> AppResult<Json<ConversationView>> {
    let view =
        messaging::open_conversation(state.store.as_ref(), conversation_id, current.user.id)
            .await?;
    Ok(Json(view))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    current: CurrentUser,
    Json(request): Json<MessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = messaging::send_message(
        state.store.as_ref(),
        conversation_id,
        &current.user,
        &request.body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn unread_messages(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<UnreadMessages>> {
    Ok(Json(
        messaging::unread_messages(state.store.as_ref(), current.user.id).await?,
    ))
}
