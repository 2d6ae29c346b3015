use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::DbId;
use crate::error::AppError;

/// A private thread between two or more users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: DbId,
    pub participant_ids: Vec<DbId>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: DbId) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// First participant that is not `user_id`
    pub fn other_participant(&self, user_id: DbId) -> Option<DbId> {
        self.participant_ids.iter().copied().find(|id| *id != user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// First 50 characters of the body
    pub fn preview(&self) -> String {
        self.body.chars().take(50).collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    WatchParty,
    Review,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Message => "message",
            NotificationKind::WatchParty => "watch_party",
            NotificationKind::Review => "review",
            NotificationKind::System => "system",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(NotificationKind::Message),
            "watch_party" => Ok(NotificationKind::WatchParty),
            "review" => Ok(NotificationKind::Review),
            "system" => Ok(NotificationKind::System),
            other => Err(AppError::Internal(format!(
                "Unknown notification kind '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_participant() {
        let conversation = Conversation {
            id: 1,
            participant_ids: vec![4, 9],
            created_at: Utc::now(),
            last_activity: Utc::now(),
        };
        assert_eq!(conversation.other_participant(4), Some(9));
        assert_eq!(conversation.other_participant(9), Some(4));
        assert!(conversation.includes(9));
        assert!(!conversation.includes(5));
    }

    #[test]
    fn test_message_preview_truncates_on_chars() {
        let message = Message {
            id: 1,
            conversation_id: 1,
            sender_id: 1,
            body: "ñ".repeat(80),
            sent_at: Utc::now(),
            read: false,
            read_at: None,
        };
        assert_eq!(message.preview().chars().count(), 50);
    }

    #[test]
    fn test_notification_kind_round_trip() {
        for kind in [
            NotificationKind::Message,
            NotificationKind::WatchParty,
            NotificationKind::Review,
            NotificationKind::System,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert_eq!(
            serde_json::to_string(&NotificationKind::WatchParty).unwrap(),
            "\"watch_party\""
        );
    }
}
