use chrono::{DateTime, Utc};

use super::{MemoryStore, Tables};
use crate::{
    db::WatchPartyStore,
    error::{AppError, AppResult},
    models::{
        DbId, JoinOutcome, NewWatchParty, PartyChatMessage, PartyStatus, PlaybackUpdate,
        WatchParty,
    },
};

impl Tables {
    fn party_mut(&mut self, party_id: DbId) -> AppResult<&mut WatchParty> {
        self.parties
            .get_mut(&party_id)
            .ok_or_else(|| AppError::NotFound(format!("Watch party {} not found", party_id)))
    }
}

#[async_trait::async_trait]
impl WatchPartyStore for MemoryStore {
    async fn create_party(&self, party: NewWatchParty) -> AppResult<WatchParty> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&party.movie_id) {
            return Err(AppError::NotFound(format!(
                "Movie {} not found",
                party.movie_id
            )));
        }
        if tables
            .parties
            .values()
            .any(|existing| existing.invite_code == party.invite_code)
        {
            return Err(AppError::Conflict("Invite code already in use".to_string()));
        }

        let now = Utc::now();
        let created = WatchParty {
            id: tables.next_id(),
            movie_id: party.movie_id,
            host_id: party.host_id,
            participant_ids: vec![party.host_id],
            name: party.name,
            description: party.description,
            scheduled_for: party.scheduled_for,
            created_at: now,
            status: PartyStatus::Waiting,
            position_seconds: 0,
            playing: false,
            playback_updated_at: now,
            public: party.public,
            max_participants: party.max_participants,
            invite_code: party.invite_code,
        };
        tables.parties.insert(created.id, created.clone());
        Ok(created)
    }

    async fn invite_code_exists(&self, code: &str) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.parties.values().any(|party| party.invite_code == code))
    }

    async fn find_party(&self, id: DbId) -> AppResult<Option<WatchParty>> {
        Ok(self.tables.read().await.parties.get(&id).cloned())
    }

    async fn find_party_by_code(&self, code: &str) -> AppResult<Option<WatchParty>> {
        let tables = self.tables.read().await;
        Ok(tables
            .parties
            .values()
            .find(|party| party.invite_code == code)
            .cloned())
    }

    async fn user_parties(&self, user_id: DbId) -> AppResult<Vec<WatchParty>> {
        let tables = self.tables.read().await;
        let mut parties: Vec<WatchParty> = tables
            .parties
            .values()
            .filter(|party| party.is_host(user_id) || party.is_participant(user_id))
            .cloned()
            .collect();
        parties.sort_by(|a, b| {
            b.scheduled_for
                .cmp(&a.scheduled_for)
                .then(b.id.cmp(&a.id))
        });
        Ok(parties)
    }

    async fn public_upcoming_parties(
        &self,
        user_id: DbId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<WatchParty>> {
        let tables = self.tables.read().await;
        let mut parties: Vec<WatchParty> = tables
            .parties
            .values()
            .filter(|party| {
                party.public
                    && party.status == PartyStatus::Waiting
                    && party.scheduled_for >= now
                    && !party.is_participant(user_id)
            })
            .cloned()
            .collect();
        parties.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then(a.id.cmp(&b.id))
        });
        Ok(parties)
    }

    async fn upcoming_parties_for_movie(
        &self,
        movie_id: DbId,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<WatchParty>> {
        let tables = self.tables.read().await;
        let mut parties: Vec<WatchParty> = tables
            .parties
            .values()
            .filter(|party| {
                party.movie_id == movie_id
                    && party.status == PartyStatus::Waiting
                    && party.scheduled_for >= now
            })
            .cloned()
            .collect();
        parties.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then(a.id.cmp(&b.id))
        });
        parties.truncate(limit as usize);
        Ok(parties)
    }

    async fn join_party(&self, party_id: DbId, user_id: DbId) -> AppResult<JoinOutcome> {
        let mut tables = self.tables.write().await;
        let party = tables.party_mut(party_id)?;

        if party.is_participant(user_id) {
            return Ok(JoinOutcome::AlreadyParticipant);
        }
        if !party.can_join() {
            return Err(AppError::Conflict("This watch party is full".to_string()));
        }

        party.participant_ids.push(user_id);
        Ok(JoinOutcome::Joined)
    }

    async fn leave_party(&self, party_id: DbId, user_id: DbId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let party = tables.party_mut(party_id)?;
        let before = party.participant_ids.len();
        party.participant_ids.retain(|id| *id != user_id);
        Ok(party.participant_ids.len() != before)
    }

    async fn update_playback(
        &self,
        party_id: DbId,
        update: PlaybackUpdate,
    ) -> AppResult<WatchParty> {
        let mut tables = self.tables.write().await;
        let party = tables.party_mut(party_id)?;
        party.position_seconds = update.position_seconds;
        party.playing = update.playing;
        party.playback_updated_at = Utc::now();
        Ok(party.clone())
    }

    async fn set_party_status(
        &self,
        party_id: DbId,
        status: PartyStatus,
    ) -> AppResult<WatchParty> {
        let mut tables = self.tables.write().await;
        let party = tables.party_mut(party_id)?;
        party.status = status;
        Ok(party.clone())
    }

    async fn add_party_message(
        &self,
        party_id: DbId,
        user_id: DbId,
        body: &str,
    ) -> AppResult<PartyChatMessage> {
        let mut tables = self.tables.write().await;
        if !tables.parties.contains_key(&party_id) {
            return Err(AppError::NotFound(format!(
                "Watch party {} not found",
                party_id
            )));
        }

        let message = PartyChatMessage {
            id: tables.next_id(),
            party_id,
            user_id,
            author: tables.author_name(user_id),
            body: body.to_string(),
            sent_at: Utc::now(),
        };
        tables.party_messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn party_messages(&self, party_id: DbId) -> AppResult<Vec<PartyChatMessage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .party_messages
            .values()
            .filter(|message| message.party_id == party_id)
            .map(|message| PartyChatMessage {
                author: tables.author_name(message.user_id),
                ..message.clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::CatalogStore,
        models::{Classification, NewMovie},
    };
    use chrono::{Duration, NaiveDate};

    async fn store_with_party(max_participants: i32) -> (MemoryStore, WatchParty) {
        let store = MemoryStore::new();
        let genre = store.create_genre("Aventura", "").await.unwrap();
        let movie = store
            .create_movie(NewMovie {
                title: "Hook".to_string(),
                original_title: String::new(),
                synopsis: "Peter Pan grows up".to_string(),
                year: 1991,
                duration_minutes: 142,
                director_id: None,
                country: "USA".to_string(),
                language: "EN".to_string(),
                poster_url: None,
                trailer_url: None,
                release_date: NaiveDate::from_ymd_opt(1991, 12, 11).unwrap(),
                budget: None,
                revenue: None,
                classification: Classification::Pg,
                genre_ids: vec![genre.id],
                actor_ids: vec![],
            })
            .await
            .unwrap();
        let party = store
            .create_party(NewWatchParty {
                movie_id: movie.id,
                host_id: 100,
                name: "Friday".to_string(),
                description: String::new(),
                scheduled_for: Utc::now() + Duration::hours(2),
                public: true,
                max_participants,
                invite_code: "ABCD1234".to_string(),
            })
            .await
            .unwrap();
        (store, party)
    }

    #[tokio::test]
    async fn test_host_is_first_participant() {
        let (_, party) = store_with_party(10).await;
        assert_eq!(party.participant_ids, vec![100]);
        assert_eq!(party.status, PartyStatus::Waiting);
    }

    #[tokio::test]
    async fn test_join_rejected_at_capacity_until_someone_leaves() {
        let (store, party) = store_with_party(2).await;

        assert_eq!(store.join_party(party.id, 1).await.unwrap(), JoinOutcome::Joined);
        let full = store.join_party(party.id, 2).await;
        assert!(matches!(full, Err(AppError::Conflict(_))));

        assert!(store.leave_party(party.id, 1).await.unwrap());
        assert_eq!(store.join_party(party.id, 2).await.unwrap(), JoinOutcome::Joined);
    }

    #[tokio::test]
    async fn test_rejoin_is_noop_even_when_full() {
        let (store, party) = store_with_party(2).await;
        store.join_party(party.id, 1).await.unwrap();
        assert_eq!(
            store.join_party(party.id, 1).await.unwrap(),
            JoinOutcome::AlreadyParticipant
        );
    }

    #[tokio::test]
    async fn test_duplicate_invite_code_conflicts() {
        let (store, party) = store_with_party(10).await;
        let result = store
            .create_party(NewWatchParty {
                movie_id: party.movie_id,
                host_id: 5,
                name: "Copy".to_string(),
                description: String::new(),
                scheduled_for: Utc::now() + Duration::hours(1),
                public: false,
                max_participants: 10,
                invite_code: party.invite_code.clone(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(store.invite_code_exists("ABCD1234").await.unwrap());
    }

    #[tokio::test]
    async fn test_public_upcoming_excludes_members() {
        let (store, party) = store_with_party(10).await;
        let now = Utc::now();
        assert!(store.public_upcoming_parties(100, now).await.unwrap().is_empty());
        let visible = store.public_upcoming_parties(7, now).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, party.id);
    }
}
