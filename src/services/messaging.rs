use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{AccountStore, SocialStore, Store},
    error::{AppError, AppResult},
    models::{Conversation, DbId, Message, NewNotification, NotificationKind, PublicUser, User},
    services::{notifications::notify, required_text},
};

/// One row of the inbox
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: DbId,
    pub other_user: Option<PublicUser>,
    pub unread_count: i64,
    pub last_message: Option<Message>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    pub conversations: Vec<ConversationSummary>,
    pub total_unread: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub conversation: Conversation,
    pub other_user: Option<PublicUser>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedConversation {
    pub conversation: Conversation,
    pub created: bool,
}

/// Polling payload for the message badge
#[derive(Debug, Clone, Serialize)]
pub struct UnreadMessages {
    pub total_unread: i64,
    pub conversations: Vec<UnreadConversation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadConversation {
    pub conversation_id: DbId,
    pub unread_count: i64,
    pub other_user: String,
    pub last_message_id: Option<DbId>,
    pub preview: String,
}

/// Conversations by last activity with their unread counts
pub async fn inbox(store: &dyn Store, user_id: DbId) -> AppResult<Inbox> {
    let mut conversations = Vec::new();
    let mut total_unread = 0;

    for conversation in store.user_conversations(user_id).await? {
        let unread_count = store.unread_count(conversation.id, user_id).await?;
        total_unread += unread_count;
        conversations.push(ConversationSummary {
            id: conversation.id,
            other_user: other_user(store, &conversation, user_id).await?,
            unread_count,
            last_message: store.last_message(conversation.id).await?,
            last_activity: conversation.last_activity,
        });
    }

    Ok(Inbox {
        conversations,
        total_unread,
    })
}

/// Reuses the direct conversation between the two users when there is one
pub async fn start_conversation(
    store: &dyn Store,
    user_id: DbId,
    other_id: DbId,
) -> AppResult<StartedConversation> {
    if user_id == other_id {
        return Err(AppError::InvalidInput(
            "You cannot start a conversation with yourself".to_string(),
        ));
    }
    if store.find_user(other_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", other_id)));
    }

    if let Some(conversation) = store.find_direct_conversation(user_id, other_id).await? {
        return Ok(StartedConversation {
            conversation,
            created: false,
        });
    }

    let conversation = store.create_conversation(&[user_id, other_id]).await?;
    tracing::info!(
        conversation_id = conversation.id,
        user_id,
        other_id,
        "Started conversation"
    );
    Ok(StartedConversation {
        conversation,
        created: true,
    })
}

/// Marks incoming messages read and returns the thread chronologically
pub async fn open_conversation(
    store: &dyn Store,
    conversation_id: DbId,
    user_id: DbId,
) -> AppResult<ConversationView> {
    let conversation = participant_conversation(store, conversation_id, user_id).await?;

    let marked = store.mark_conversation_read(conversation.id, user_id).await?;
    if marked > 0 {
        tracing::debug!(conversation_id, user_id, marked, "Marked messages read");
    }

    let messages = store.conversation_messages(conversation.id).await?;
    let other_user = other_user(store, &conversation, user_id).await?;

    Ok(ConversationView {
        conversation,
        other_user,
        messages,
    })
}

/// Appends a message and notifies the other participant
pub async fn send_message(
    store: &dyn Store,
    conversation_id: DbId,
    sender: &User,
    body: &str,
) -> AppResult<Message> {
    let conversation = participant_conversation(store, conversation_id, sender.id).await?;
    let body = required_text("Message", body, None)?;

    let message = store.add_message(conversation.id, sender.id, &body).await?;

    if let Some(recipient) = conversation.other_participant(sender.id) {
        notify(
            store,
            NewNotification {
                user_id: recipient,
                kind: NotificationKind::Message,
                title: format!("New message from {}", sender.display_name()),
                message: message.preview(),
                url: format!("/messages/{}/", conversation.id),
            },
        )
        .await?;
    }

    tracing::info!(conversation_id, sender_id = sender.id, message_id = message.id, "Sent message");
    Ok(message)
}

/// Conversations with unread messages, for polling
pub async fn unread_messages(store: &dyn Store, user_id: DbId) -> AppResult<UnreadMessages> {
    let mut conversations = Vec::new();
    let mut total_unread = 0;

    for conversation in store.user_conversations(user_id).await? {
        let unread_count = store.unread_count(conversation.id, user_id).await?;
        if unread_count == 0 {
            continue;
        }
        total_unread += unread_count;

        let last_message = store.last_message(conversation.id).await?;
        conversations.push(UnreadConversation {
            conversation_id: conversation.id,
            unread_count,
            other_user: other_user(store, &conversation, user_id)
                .await?
                .map(|user| user.display_name)
                .unwrap_or_default(),
            last_message_id: last_message.as_ref().map(|m| m.id),
            preview: last_message.map(|m| m.preview()).unwrap_or_default(),
        });
    }

    Ok(UnreadMessages {
        total_unread,
        conversations,
    })
}

/// Non-participants get the same 404 as a missing conversation
async fn participant_conversation(
    store: &dyn Store,
    conversation_id: DbId,
    user_id: DbId,
) -> AppResult<Conversation> {
    store
        .find_conversation(conversation_id)
        .await?
        .filter(|conversation| conversation.includes(user_id))
        .ok_or_else(|| AppError::NotFound(format!("Conversation {} not found", conversation_id)))
}

async fn other_user(
    store: &dyn Store,
    conversation: &Conversation,
    user_id: DbId,
) -> AppResult<Option<PublicUser>> {
    let Some(other_id) = conversation.other_participant(user_id) else {
        return Ok(None);
    };
    Ok(store
        .find_user(other_id)
        .await?
        .map(|user| PublicUser::from(&user)))
}
