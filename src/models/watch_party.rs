use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::DbId;
use crate::error::AppError;

pub const DEFAULT_MAX_PARTICIPANTS: i32 = 10;
pub const MIN_PARTICIPANTS: i32 = 2;
pub const MAX_PARTICIPANTS: i32 = 50;
pub const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartyStatus {
    Waiting,
    InProgress,
    Finished,
    Cancelled,
}

impl PartyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyStatus::Waiting => "waiting",
            PartyStatus::InProgress => "in_progress",
            PartyStatus::Finished => "finished",
            PartyStatus::Cancelled => "cancelled",
        }
    }
}

impl Display for PartyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PartyStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(PartyStatus::Waiting),
            "in_progress" => Ok(PartyStatus::InProgress),
            "finished" => Ok(PartyStatus::Finished),
            "cancelled" => Ok(PartyStatus::Cancelled),
            other => Err(AppError::Internal(format!(
                "Unknown watch party status '{}'",
                other
            ))),
        }
    }
}

/// A scheduled group viewing of one movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchParty {
    pub id: DbId,
    pub movie_id: DbId,
    pub host_id: DbId,
    pub participant_ids: Vec<DbId>,
    pub name: String,
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: PartyStatus,
    /// Current playback second shared by everyone in the party
    pub position_seconds: i32,
    pub playing: bool,
    pub playback_updated_at: DateTime<Utc>,
    pub public: bool,
    pub max_participants: i32,
    pub invite_code: String,
}

impl WatchParty {
    pub fn participant_count(&self) -> usize {
        self.participant_ids.len()
    }

    pub fn can_join(&self) -> bool {
        (self.participant_count() as i64) < self.max_participants as i64
    }

    pub fn is_participant(&self, user_id: DbId) -> bool {
        self.participant_ids.contains(&user_id)
    }

    pub fn is_host(&self, user_id: DbId) -> bool {
        self.host_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWatchParty {
    pub movie_id: DbId,
    pub host_id: DbId,
    pub name: String,
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    pub public: bool,
    pub max_participants: i32,
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyChatMessage {
    pub id: DbId,
    pub party_id: DbId,
    pub user_id: DbId,
    /// Display name of the sender
    pub author: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    AlreadyParticipant,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PlaybackUpdate {
    pub position_seconds: i32,
    pub playing: bool,
}
