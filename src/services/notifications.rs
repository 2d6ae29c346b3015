use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{SocialStore, Store},
    error::AppResult,
    models::{DbId, NewNotification, Notification, NotificationKind},
};

const UNREAD_POLL_LIMIT: u64 = 10;

/// Polling payload for the notification badge
#[derive(Debug, Clone, Serialize)]
pub struct UnreadNotifications {
    pub count: usize,
    pub notifications: Vec<NotificationItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationItem {
    pub id: DbId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationItem {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            url: notification.url,
            created_at: notification.created_at,
        }
    }
}

pub async fn notify(store: &dyn Store, notification: NewNotification) -> AppResult<Notification> {
    let created = store.create_notification(notification).await?;
    tracing::debug!(
        user_id = created.user_id,
        kind = %created.kind,
        "Created notification"
    );
    Ok(created)
}

/// Returns every notification as it was, then marks them all read
pub async fn all_notifications(store: &dyn Store, user_id: DbId) -> AppResult<Vec<Notification>> {
    let notifications = store.user_notifications(user_id).await?;
    let marked = store.mark_notifications_read(user_id).await?;
    tracing::debug!(user_id, marked, "Marked notifications read");
    Ok(notifications)
}

pub async fn unread_notifications(
    store: &dyn Store,
    user_id: DbId,
) -> AppResult<UnreadNotifications> {
    let notifications: Vec<NotificationItem> = store
        .unread_notifications(user_id, UNREAD_POLL_LIMIT)
        .await?
        .into_iter()
        .map(NotificationItem::from)
        .collect();

    Ok(UnreadNotifications {
        count: notifications.len(),
        notifications,
    })
}
