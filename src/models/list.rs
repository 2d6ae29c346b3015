use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DbId;

/// A user-curated collection of movies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomList {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub movie_ids: Vec<DbId>,
}

impl CustomList {
    /// Owners always see their lists; everyone else only public ones
    pub fn visible_to(&self, user_id: Option<DbId>) -> bool {
        self.public || user_id == Some(self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewList {
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub public: bool,
}
