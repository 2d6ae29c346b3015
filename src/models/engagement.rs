use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DbId;
use crate::error::AppError;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 10;

/// A rating value known to be inside 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Score(i16);

impl Score {
    pub fn value(&self) -> i16 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&value) {
            Ok(Score(value as i16))
        } else {
            Err(AppError::InvalidInput(format!(
                "Rating must be between {} and {}",
                MIN_SCORE, MAX_SCORE
            )))
        }
    }
}

/// One user's numeric rating of one movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: DbId,
    pub movie_id: DbId,
    pub user_id: DbId,
    pub score: i16,
    pub created_at: DateTime<Utc>,
}

/// One user's written review of one movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: DbId,
    pub movie_id: DbId,
    pub user_id: DbId,
    /// Username of the author
    pub author: String,
    pub title: String,
    pub body: String,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewingRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub movie_id: DbId,
    pub viewed_at: DateTime<Utc>,
    pub minutes_watched: i32,
    pub completed: bool,
}

/// Result of an insert-or-update on a unique pair
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Upserted<T> {
    pub record: T,
    pub created: bool,
}
