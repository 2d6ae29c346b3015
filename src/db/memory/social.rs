use chrono::Utc;

use super::MemoryStore;
use crate::{
    db::SocialStore,
    error::{AppError, AppResult},
    models::{Conversation, DbId, Message, NewNotification, Notification},
};

#[async_trait::async_trait]
impl SocialStore for MemoryStore {
    async fn find_direct_conversation(&self, a: DbId, b: DbId) -> AppResult<Option<Conversation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .conversations
            .values()
            .find(|conversation| {
                conversation.participant_ids.len() == 2
                    && conversation.includes(a)
                    && conversation.includes(b)
            })
            .cloned())
    }

    async fn create_conversation(&self, participant_ids: &[DbId]) -> AppResult<Conversation> {
        let mut tables = self.tables.write().await;
        let mut participant_ids = participant_ids.to_vec();
        participant_ids.sort_unstable();
        participant_ids.dedup();

        let now = Utc::now();
        let conversation = Conversation {
            id: tables.next_id(),
            participant_ids,
            created_at: now,
            last_activity: now,
        };
        tables
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(&self, id: DbId) -> AppResult<Option<Conversation>> {
        Ok(self.tables.read().await.conversations.get(&id).cloned())
    }

    async fn user_conversations(&self, user_id: DbId) -> AppResult<Vec<Conversation>> {
        let tables = self.tables.read().await;
        let mut conversations: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|conversation| conversation.includes(user_id))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then(b.id.cmp(&a.id))
        });
        Ok(conversations)
    }

    async fn add_message(
        &self,
        conversation_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> AppResult<Message> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();

        let conversation = tables
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Conversation {} not found", conversation_id))
            })?;
        conversation.last_activity = now;

        let message = Message {
            id,
            conversation_id,
            sender_id,
            body: body.to_string(),
            sent_at: now,
            read: false,
            read_at: None,
        };
        tables.messages.insert(id, message.clone());
        Ok(message)
    }

    async fn conversation_messages(&self, conversation_id: DbId) -> AppResult<Vec<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .values()
            .filter(|message| message.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn last_message(&self, conversation_id: DbId) -> AppResult<Option<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .values()
            .rev()
            .find(|message| message.conversation_id == conversation_id)
            .cloned())
    }

    async fn unread_count(&self, conversation_id: DbId, reader: DbId) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .values()
            .filter(|message| {
                message.conversation_id == conversation_id
                    && message.sender_id != reader
                    && !message.read
            })
            .count() as i64)
    }

    async fn mark_conversation_read(&self, conversation_id: DbId, reader: DbId) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for message in tables.messages.values_mut() {
            if message.conversation_id == conversation_id
                && message.sender_id != reader
                && !message.read
            {
                message.read = true;
                message.read_at.get_or_insert(now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn create_notification(&self, notification: NewNotification) -> AppResult<Notification> {
        let mut tables = self.tables.write().await;
        let created = Notification {
            id: tables.next_id(),
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            read: false,
            url: notification.url,
            created_at: Utc::now(),
        };
        tables.notifications.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user_notifications(&self, user_id: DbId) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .rev()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn unread_notifications(
        &self,
        user_id: DbId,
        limit: u64,
    ) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .rev()
            .filter(|notification| notification.user_id == user_id && !notification.read)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_notifications_read(&self, user_id: DbId) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for notification in tables.notifications.values_mut() {
            if notification.user_id == user_id && !notification.read {
                notification.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;

    #[tokio::test]
    async fn test_direct_conversation_lookup_ignores_order() {
        let store = MemoryStore::new();
        let created = store.create_conversation(&[9, 4]).await.unwrap();
        let found = store.find_direct_conversation(4, 9).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(created.id));
        assert!(store.find_direct_conversation(4, 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unread_counts_only_messages_from_others() {
        let store = MemoryStore::new();
        let conversation = store.create_conversation(&[1, 2]).await.unwrap();
        store.add_message(conversation.id, 1, "hola").await.unwrap();
        store.add_message(conversation.id, 2, "hey").await.unwrap();
        store.add_message(conversation.id, 2, "¿vamos?").await.unwrap();

        assert_eq!(store.unread_count(conversation.id, 1).await.unwrap(), 2);
        assert_eq!(store.unread_count(conversation.id, 2).await.unwrap(), 1);

        assert_eq!(store.mark_conversation_read(conversation.id, 1).await.unwrap(), 2);
        assert_eq!(store.unread_count(conversation.id, 1).await.unwrap(), 0);

        let last = store.last_message(conversation.id).await.unwrap().unwrap();
        assert_eq!(last.body, "¿vamos?");
    }

    #[tokio::test]
    async fn test_add_message_to_unknown_conversation() {
        let store = MemoryStore::new();
        let result = store.add_message(404, 1, "hola").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unread_notifications_newest_first() {
        let store = MemoryStore::new();
        for title in ["first", "second", "third"] {
            store
                .create_notification(NewNotification {
                    user_id: 1,
                    kind: NotificationKind::System,
                    title: title.to_string(),
                    message: String::new(),
                    url: String::new(),
                })
                .await
                .unwrap();
        }

        let unread = store.unread_notifications(1, 2).await.unwrap();
        let titles: Vec<&str> = unread.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second"]);

        assert_eq!(store.mark_notifications_read(1).await.unwrap(), 3);
        assert!(store.unread_notifications(1, 10).await.unwrap().is_empty());
    }
}
