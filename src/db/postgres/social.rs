use super::{
    constraint_error,
    rows::{try_collect, ConversationRow, MessageRow, NotificationRow, CONVERSATION_SELECT},
    PgStore,
};
use crate::{
    db::SocialStore,
    error::{AppError, AppResult},
    models::{Conversation, DbId, Message, NewNotification, Notification},
};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, sent_at, read, read_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, read, url, created_at";

#[async_trait::async_trait]
impl SocialStore for PgStore {
    async fn find_direct_conversation(&self, a: DbId, b: DbId) -> AppResult<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            r#"
            {CONVERSATION_SELECT}
            WHERE (SELECT COUNT(*) FROM conversation_participants p
                   WHERE p.conversation_id = c.id) = 2
              AND EXISTS (SELECT 1 FROM conversation_participants p
                          WHERE p.conversation_id = c.id AND p.user_id = $1)
              AND EXISTS (SELECT 1 FROM conversation_participants p
                          WHERE p.conversation_id = c.id AND p.user_id = $2)
            ORDER BY c.id
            LIMIT 1
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Conversation::from))
    }

    async fn create_conversation(&self, participant_ids: &[DbId]) -> AppResult<Conversation> {
        let mut tx = self.pool.begin().await?;

        let id: DbId =
            sqlx::query_scalar("INSERT INTO conversations DEFAULT VALUES RETURNING id")
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO conversation_participants (conversation_id, user_id)
            SELECT $1, p FROM UNNEST($2::bigint[]) AS p
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(participant_ids.to_vec())
        .execute(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Conversation participant"))?;

        tx.commit().await?;

        self.find_conversation(id)
            .await?
            .ok_or_else(|| AppError::Internal("Created conversation vanished".to_string()))
    }

    async fn find_conversation(&self, id: DbId) -> AppResult<Option<Conversation>> {
        let row: Option<ConversationRow> =
            sqlx::query_as(&format!("{CONVERSATION_SELECT} WHERE c.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Conversation::from))
    }

    async fn user_conversations(&self, user_id: DbId) -> AppResult<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            r#"
            {CONVERSATION_SELECT}
            WHERE EXISTS (SELECT 1 FROM conversation_participants p
                          WHERE p.conversation_id = c.id AND p.user_id = $1)
            ORDER BY c.last_activity DESC, c.id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn add_message(
        &self,
        conversation_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> AppResult<Message> {
        let mut tx = self.pool.begin().await?;

        let bumped: Option<DbId> = sqlx::query_scalar(
            "UPDATE conversations SET last_activity = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(conversation_id)
        .fetch_optional(&mut *tx)
        .await?;

        if bumped.is_none() {
            return Err(AppError::NotFound(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }

        let row: MessageRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body)
            VALUES ($1, $2, $3)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Message"))?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn conversation_messages(&self, conversation_id: DbId) -> AppResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY sent_at, id"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn last_message(&self, conversation_id: DbId) -> AppResult<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE conversation_id = $1
            ORDER BY sent_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Message::from))
    }

    async fn unread_count(&self, conversation_id: DbId, reader: DbId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT read
            "#,
        )
        .bind(conversation_id)
        .bind(reader)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_conversation_read(&self, conversation_id: DbId, reader: DbId) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT read
            "#,
        )
        .bind(conversation_id)
        .bind(reader)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn create_notification(&self, notification: NewNotification) -> AppResult<Notification> {
        let row: NotificationRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Notification"))?;
        row.try_into()
    }

    async fn user_notifications(&self, user_id: DbId) -> AppResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        try_collect(rows)
    }

    async fn unread_notifications(
        &self,
        user_id: DbId,
        limit: u64,
    ) -> AppResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND NOT read
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        try_collect(rows)
    }

    async fn mark_notifications_read(&self, user_id: DbId) -> AppResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
