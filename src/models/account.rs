use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DbId;

pub const TERMS_VERSION: &str = "1.0";

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_staff: bool,
    pub joined_at: DateTime<Utc>,
}

impl User {
    /// Full name when one is set, otherwise the username
    pub fn display_name(&self) -> String {
        display_name(&self.username, &self.first_name, &self.last_name)
    }
}

pub fn display_name(username: &str, first_name: &str, last_name: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

/// What other users get to see about an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: DbId,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// Terms-and-conditions acceptance attached to every account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub user_id: DbId,
    pub accepted_terms: bool,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub terms_version: String,
}

/// Social hub row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserActivity {
    pub user: PublicUser,
    pub rating_count: i64,
    pub review_count: i64,
    pub favorite_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            username: "indy".to_string(),
            email: "indy@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: "hash".to_string(),
            is_staff: false,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(user("Henry", "Jones").display_name(), "Henry Jones");
        assert_eq!(user("Henry", "").display_name(), "Henry");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user("", " ").display_name(), "indy");
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(user("Henry", "Jones")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "indy");
    }
}
