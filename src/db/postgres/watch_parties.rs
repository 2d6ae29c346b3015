use chrono::{DateTime, Utc};

use super::{
    constraint_error,
    rows::{try_collect, PartyMessageRow, PartyRow, PARTY_SELECT},
    PgStore,
};
use crate::{
    db::WatchPartyStore,
    error::{AppError, AppResult},
    models::{
        DbId, JoinOutcome, NewWatchParty, PartyChatMessage, PartyStatus, PlaybackUpdate,
        WatchParty,
    },
};

fn party_not_found(party_id: DbId) -> AppError {
    AppError::NotFound(format!("Watch party {} not found", party_id))
}

impl PgStore {
    async fn require_party(&self, party_id: DbId) -> AppResult<WatchParty> {
        self.find_party(party_id)
            .await?
            .ok_or_else(|| party_not_found(party_id))
    }
}

#[async_trait::async_trait]
impl WatchPartyStore for PgStore {
    async fn create_party(&self, party: NewWatchParty) -> AppResult<WatchParty> {
        let mut tx = self.pool.begin().await?;

        let id: DbId = sqlx::query_scalar(
            r#"
            INSERT INTO watch_parties (movie_id, host_id, name, description, scheduled_for,
                                       public, max_participants, invite_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(party.movie_id)
        .bind(party.host_id)
        .bind(&party.name)
        .bind(&party.description)
        .bind(party.scheduled_for)
        .bind(party.public)
        .bind(party.max_participants)
        .bind(&party.invite_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Watch party"))?;

        sqlx::query("INSERT INTO watch_party_participants (party_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(party.host_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.require_party(id).await
    }

    async fn invite_code_exists(&self, code: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM watch_parties WHERE invite_code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_party(&self, id: DbId) -> AppResult<Option<WatchParty>> {
        let row: Option<PartyRow> = sqlx::query_as(&format!("{PARTY_SELECT} WHERE w.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(WatchParty::try_from).transpose()
    }

    async fn find_party_by_code(&self, code: &str) -> AppResult<Option<WatchParty>> {
        let row: Option<PartyRow> =
            sqlx::query_as(&format!("{PARTY_SELECT} WHERE w.invite_code = $1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        row.map(WatchParty::try_from).transpose()
    }

    async fn user_parties(&self, user_id: DbId) -> AppResult<Vec<WatchParty>> {
        let rows: Vec<PartyRow> = sqlx::query_as(&format!(
            r#"
            {PARTY_SELECT}
            WHERE w.host_id = $1
               OR EXISTS (SELECT 1 FROM watch_party_participants p
                          WHERE p.party_id = w.id AND p.user_id = $1)
            ORDER BY w.scheduled_for DESC, w.id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        try_collect(rows)
    }

    async fn public_upcoming_parties(
        &self,
        user_id: DbId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<WatchParty>> {
        let rows: Vec<PartyRow> = sqlx::query_as(&format!(
            r#"
            {PARTY_SELECT}
            WHERE w.public AND w.status = $2 AND w.scheduled_for >= $3
              AND NOT EXISTS (SELECT 1 FROM watch_party_participants p
                              WHERE p.party_id = w.id AND p.user_id = $1)
            ORDER BY w.scheduled_for ASC, w.id ASC
            "#
        ))
        .bind(user_id)
        .bind(PartyStatus::Waiting.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        try_collect(rows)
    }

    async fn upcoming_parties_for_movie(
        &self,
        movie_id: DbId,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<WatchParty>> {
        let rows: Vec<PartyRow> = sqlx::query_as(&format!(
            r#"
            {PARTY_SELECT}
            WHERE w.movie_id = $1 AND w.status = $2 AND w.scheduled_for >= $3
            ORDER BY w.scheduled_for ASC, w.id ASC
            LIMIT $4
            "#
        ))
        .bind(movie_id)
        .bind(PartyStatus::Waiting.as_str())
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        try_collect(rows)
    }

    async fn join_party(&self, party_id: DbId, user_id: DbId) -> AppResult<JoinOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent joins on the same party
        let max_participants: Option<i32> = sqlx::query_scalar(
            "SELECT max_participants FROM watch_parties WHERE id = $1 FOR UPDATE",
        )
        .bind(party_id)
        .fetch_optional(&mut *tx)
        .await?;
        let max_participants = max_participants.ok_or_else(|| party_not_found(party_id))?;

        let (already, count): (bool, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(BOOL_OR(user_id = $2), FALSE), COUNT(*)
            FROM watch_party_participants WHERE party_id = $1
            "#,
        )
        .bind(party_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already {
            return Ok(JoinOutcome::AlreadyParticipant);
        }
        if count >= max_participants as i64 {
            return Err(AppError::Conflict("This watch party is full".to_string()));
        }

        sqlx::query("INSERT INTO watch_party_participants (party_id, user_id) VALUES ($1, $2)")
            .bind(party_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| constraint_error(e, "Participant"))?;

        tx.commit().await?;
        Ok(JoinOutcome::Joined)
    }

    async fn leave_party(&self, party_id: DbId, user_id: DbId) -> AppResult<bool> {
        self.require_party(party_id).await?;
        let result =
            sqlx::query("DELETE FROM watch_party_participants WHERE party_id = $1 AND user_id = $2")
                .bind(party_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_playback(
        &self,
        party_id: DbId,
        update: PlaybackUpdate,
    ) -> AppResult<WatchParty> {
        let updated = sqlx::query(
            r#"
            UPDATE watch_parties
            SET position_seconds = $2, playing = $3, playback_updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(party_id)
        .bind(update.position_seconds)
        .bind(update.playing)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(party_not_found(party_id));
        }
        self.require_party(party_id).await
    }

    async fn set_party_status(
        &self,
        party_id: DbId,
        status: PartyStatus,
    ) -> AppResult<WatchParty> {
        let updated = sqlx::query("UPDATE watch_parties SET status = $2 WHERE id = $1")
            .bind(party_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(party_not_found(party_id));
        }
        self.require_party(party_id).await
    }

    async fn add_party_message(
        &self,
        party_id: DbId,
        user_id: DbId,
        body: &str,
    ) -> AppResult<PartyChatMessage> {
        let row: PartyMessageRow = sqlx::query_as(
            r#"
            WITH inserted AS (
                INSERT INTO watch_party_messages (party_id, user_id, body)
                VALUES ($1, $2, $3)
                RETURNING id, party_id, user_id, body, sent_at
            )
            SELECT i.id, i.party_id, i.user_id, u.username, u.first_name, u.last_name,
                   i.body, i.sent_at
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(party_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Chat message"))?;
        Ok(row.into())
    }

    async fn party_messages(&self, party_id: DbId) -> AppResult<Vec<PartyChatMessage>> {
        let rows: Vec<PartyMessageRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.party_id, m.user_id, u.username, u.first_name, u.last_name,
                   m.body, m.sent_at
            FROM watch_party_messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.party_id = $1
            ORDER BY m.sent_at, m.id
            "#,
        )
        .bind(party_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PartyChatMessage::from).collect())
    }
}
