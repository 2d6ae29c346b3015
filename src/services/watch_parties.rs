use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    db::{Store, WatchPartyStore},
    error::{AppError, AppResult},
    models::{
        watch_party::{
            DEFAULT_MAX_PARTICIPANTS, INVITE_CODE_LEN, MAX_PARTICIPANTS, MIN_PARTICIPANTS,
        },
        DbId, JoinOutcome, NewNotification, NewWatchParty, NotificationKind, PartyChatMessage,
        PartyStatus, PlaybackUpdate, User, WatchParty,
    },
    services::{catalog::require_movie, notifications::notify, required_text},
};

const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_CODE_ATTEMPTS: usize = 16;
const MAX_PARTY_NAME_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct PartyForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub max_participants: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartyOverview {
    pub mine: Vec<WatchParty>,
    pub public: Vec<WatchParty>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartyDetail {
    pub party: WatchParty,
    pub participant_count: usize,
    pub can_join: bool,
    pub is_participant: bool,
    pub is_host: bool,
    pub messages: Vec<PartyChatMessage>,
}

/// Shared playback position polled by every participant
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub position_seconds: i32,
    pub playing: bool,
    pub status: PartyStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&WatchParty> for PlaybackState {
    fn from(party: &WatchParty) -> Self {
        Self {
            position_seconds: party.position_seconds,
            playing: party.playing,
            status: party.status,
            updated_at: party.playback_updated_at,
        }
    }
}

/// Eight characters drawn from `A-Z0-9`
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Parties the user is part of, and public ones they could join
pub async fn overview(store: &dyn Store, user_id: DbId) -> AppResult<PartyOverview> {
    Ok(PartyOverview {
        mine: store.user_parties(user_id).await?,
        public: store.public_upcoming_parties(user_id, Utc::now()).await?,
    })
}

/// Schedules a party for a movie with the host as first participant
pub async fn create_party(
    store: &dyn Store,
    host_id: DbId,
    movie_id: DbId,
    form: PartyForm,
) -> AppResult<WatchParty> {
    let name = required_text("Name", &form.name, Some(MAX_PARTY_NAME_LEN))?;
    if form.scheduled_for <= Utc::now() {
        return Err(AppError::InvalidInput(
            "The party must be scheduled in the future".to_string(),
        ));
    }
    let max_participants = form.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
    if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&max_participants) {
        return Err(AppError::InvalidInput(format!(
            "Capacity must be between {} and {} participants",
            MIN_PARTICIPANTS, MAX_PARTICIPANTS
        )));
    }
    require_movie(store, movie_id).await?;

    for _ in 0..INVITE_CODE_ATTEMPTS {
        let invite_code = generate_invite_code();
        if store.invite_code_exists(&invite_code).await? {
            continue;
        }

        let result = store
            .create_party(NewWatchParty {
                movie_id,
                host_id,
                name: name.clone(),
                description: form.description.trim().to_string(),
                scheduled_for: form.scheduled_for,
                public: form.public,
                max_participants,
                invite_code,
            })
            .await;

        match result {
            Ok(party) => {
                tracing::info!(
                    party_id = party.id,
                    movie_id,
                    host_id,
                    invite_code = %party.invite_code,
                    "Created watch party"
                );
                return Ok(party);
            }
            // Lost a race for the code
            Err(AppError::Conflict(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal(
        "Could not allocate a unique invite code".to_string(),
    ))
}

pub async fn party_detail(store: &dyn Store, party_id: DbId, user_id: DbId) -> AppResult<PartyDetail> {
    let party = require_party(store, party_id).await?;
    let messages = store.party_messages(party.id).await?;

    Ok(PartyDetail {
        participant_count: party.participant_count(),
        can_join: party.can_join(),
        is_participant: party.is_participant(user_id),
        is_host: party.is_host(user_id),
        party,
        messages,
    })
}

/// Invite codes are matched case-insensitively
pub async fn find_by_code(store: &dyn Store, code: &str) -> AppResult<WatchParty> {
    let code = code.trim().to_uppercase();
    store
        .find_party_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No watch party with code {}", code)))
}

/// Joins the party and lets the host know; joining twice is a no-op
pub async fn join(store: &dyn Store, party_id: DbId, user: &User) -> AppResult<JoinOutcome> {
    let party = require_party(store, party_id).await?;
    let outcome = store.join_party(party.id, user.id).await?;

    if outcome == JoinOutcome::Joined {
        notify(
            store,
            NewNotification {
                user_id: party.host_id,
                kind: NotificationKind::WatchParty,
                title: format!("{} joined your watch party", user.display_name()),
                message: party.name.clone(),
                url: format!("/watch-parties/{}/", party.id),
            },
        )
        .await?;
        tracing::info!(party_id, user_id = user.id, "Joined watch party");
    }

    Ok(outcome)
}

pub async fn leave(store: &dyn Store, party_id: DbId, user_id: DbId) -> AppResult<bool> {
    require_party(store, party_id).await?;
    let left = store.leave_party(party_id, user_id).await?;
    if left {
        tracing::info!(party_id, user_id, "Left watch party");
    }
    Ok(left)
}

/// Only participants may chat
pub async fn post_message(
    store: &dyn Store,
    party_id: DbId,
    user_id: DbId,
    body: &str,
) -> AppResult<PartyChatMessage> {
    let party = require_party(store, party_id).await?;
    if !party.is_participant(user_id) {
        return Err(AppError::Forbidden(
            "Only participants can chat in this watch party".to_string(),
        ));
    }
    let body = required_text("Message", body, None)?;

    store.add_party_message(party.id, user_id, &body).await
}

pub async fn playback(store: &dyn Store, party_id: DbId) -> AppResult<PlaybackState> {
    let party = require_party(store, party_id).await?;
    Ok(PlaybackState::from(&party))
}

/// Host-only
pub async fn update_playback(
    store: &dyn Store,
    party_id: DbId,
    user_id: DbId,
    update: PlaybackUpdate,
) -> AppResult<PlaybackState> {
    hosted_party(store, party_id, user_id).await?;
    if update.position_seconds < 0 {
        return Err(AppError::InvalidInput(
            "Position cannot be negative".to_string(),
        ));
    }

    let party = store.update_playback(party_id, update).await?;
    tracing::debug!(
        party_id,
        position_seconds = party.position_seconds,
        playing = party.playing,
        "Updated playback"
    );
    Ok(PlaybackState::from(&party))
}

/// Host-only; waiting → in progress
pub async fn start(store: &dyn Store, party_id: DbId, user_id: DbId) -> AppResult<WatchParty> {
    let party = hosted_party(store, party_id, user_id).await?;
    if party.status != PartyStatus::Waiting {
        return Err(AppError::Conflict(format!(
            "Cannot start a party that is {}",
            party.status
        )));
    }
    transition(store, party_id, PartyStatus::InProgress).await
}

/// Host-only; waiting or in progress → finished
pub async fn finish(store: &dyn Store, party_id: DbId, user_id: DbId) -> AppResult<WatchParty> {
    let party = hosted_party(store, party_id, user_id).await?;
    if !matches!(party.status, PartyStatus::Waiting | PartyStatus::InProgress) {
        return Err(AppError::Conflict(format!(
            "Cannot finish a party that is {}",
            party.status
        )));
    }
    transition(store, party_id, PartyStatus::Finished).await
}

async fn transition(store: &dyn Store, party_id: DbId, status: PartyStatus) -> AppResult<WatchParty> {
    let party = store.set_party_status(party_id, status).await?;
    tracing::info!(party_id, status = %party.status, "Watch party status changed");
    Ok(party)
}

async fn require_party(store: &dyn Store, party_id: DbId) -> AppResult<WatchParty> {
    store
        .find_party(party_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Watch party {} not found", party_id)))
}

async fn hosted_party(store: &dyn Store, party_id: DbId, user_id: DbId) -> AppResult<WatchParty> {
    let party = require_party(store, party_id).await?;
    if !party.is_host(user_id) {
        return Err(AppError::Forbidden(
            "Only the host can control this watch party".to_string(),
        ));
    }
    Ok(party)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryStore, SocialStore},
        services::test_support,
    };
    use chrono::Duration;

    fn form(max: Option<i32>) -> PartyForm {
        PartyForm {
            name: "Friday night".to_string(),
            description: String::new(),
            scheduled_for: Utc::now() + Duration::days(1),
            public: true,
            max_participants: max,
        }
    }

    async fn setup() -> (MemoryStore, User, DbId) {
        let store = MemoryStore::new();
        let genre = test_support::genre(&store, "Aventura").await;
        let movie = test_support::movie(&store, "Hook", vec![genre.id]).await;
        let host = test_support::user(&store, "indy").await;
        (store, host, movie.id)
    }

    #[test]
    fn test_invite_code_shape() {
        let code = generate_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_create_party_validation() {
        let (store, host, movie_id) = setup().await;

        let mut past = form(None);
        past.scheduled_for = Utc::now() - Duration::hours(1);
        let result = create_party(&store, host.id, movie_id, past).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        for max in [1, 51] {
            let result = create_party(&store, host.id, movie_id, form(Some(max))).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }

        let result = create_party(&store, host.id, 999, form(None)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let party = create_party(&store, host.id, movie_id, form(None)).await.unwrap();
        assert_eq!(party.max_participants, DEFAULT_MAX_PARTICIPANTS);
        assert_eq!(party.participant_ids, vec![host.id]);
        assert_eq!(party.status, PartyStatus::Waiting);
        assert!(!party.playing);

        let found = find_by_code(&store, &party.invite_code.to_lowercase()).await.unwrap();
        assert_eq!(found.id, party.id);
    }

    #[tokio::test]
    async fn test_full_party_rejects_until_someone_leaves() {
        let (store, host, movie_id) = setup().await;
        let marion = test_support::user(&store, "marion").await;
        let sallah = test_support::user(&store, "sallah").await;
        let party = create_party(&store, host.id, movie_id, form(Some(2))).await.unwrap();

        assert_eq!(join(&store, party.id, &marion).await.unwrap(), JoinOutcome::Joined);
        assert_eq!(
            join(&store, party.id, &marion).await.unwrap(),
            JoinOutcome::AlreadyParticipant
        );

        let result = join(&store, party.id, &sallah).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        assert!(leave(&store, party.id, marion.id).await.unwrap());
        assert_eq!(join(&store, party.id, &sallah).await.unwrap(), JoinOutcome::Joined);

        let notifications = store.user_notifications(host.id).await.unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].kind, NotificationKind::WatchParty);
    }

    #[tokio::test]
    async fn test_chat_requires_participation() {
        let (store, host, movie_id) = setup().await;
        let marion = test_support::user(&store, "marion").await;
        let party = create_party(&store, host.id, movie_id, form(None)).await.unwrap();

        let result = post_message(&store, party.id, marion.id, "hello").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        let result = post_message(&store, party.id, host.id, "  ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        post_message(&store, party.id, host.id, "Popcorn ready").await.unwrap();
        let detail = party_detail(&store, party.id, host.id).await.unwrap();
        assert!(detail.is_host);
        assert_eq!(detail.messages.len(), 1);
        assert_eq!(detail.messages[0].author, "indy");
    }

    #[tokio::test]
    async fn test_host_controls_playback_and_status() {
        let (store, host, movie_id) = setup().await;
        let marion = test_support::user(&store, "marion").await;
        let party = create_party(&store, host.id, movie_id, form(None)).await.unwrap();
        join(&store, party.id, &marion).await.unwrap();

        let update = PlaybackUpdate {
            position_seconds: 120,
            playing: true,
        };
        let result = update_playback(&store, party.id, marion.id, update).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let negative = PlaybackUpdate {
            position_seconds: -5,
            playing: true,
        };
        let result = update_playback(&store, party.id, host.id, negative).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        update_playback(&store, party.id, host.id, update).await.unwrap();
        let state = playback(&store, party.id).await.unwrap();
        assert_eq!(state.position_seconds, 120);
        assert!(state.playing);

        assert!(matches!(
            start(&store, party.id, marion.id).await,
            Err(AppError::Forbidden(_))
        ));
        let started = start(&store, party.id, host.id).await.unwrap();
        assert_eq!(started.status, PartyStatus::InProgress);
        assert!(matches!(
            start(&store, party.id, host.id).await,
            Err(AppError::Conflict(_))
        ));

        let finished = finish(&store, party.id, host.id).await.unwrap();
        assert_eq!(finished.status, PartyStatus::Finished);
        assert!(matches!(
            finish(&store, party.id, host.id).await,
            Err(AppError::Conflict(_))
        ));
    }
}
