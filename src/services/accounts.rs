use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{AccountStore, Store},
    error::{AppError, AppResult},
    models::{account::TERMS_VERSION, NewUser, User},
};

const MAX_USERNAME_LEN: usize = 150;
const MAX_NAME_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 8;

/// Sign-up form
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(default)]
    pub accept_terms: bool,
}

impl Registration {
    /// Field rules checked before touching the store
    pub fn validate(&self) -> AppResult<()> {
        let username = self.username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::InvalidInput(format!(
                "Username must be between 1 and {} characters",
                MAX_USERNAME_LEN
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            return Err(AppError::InvalidInput(
                "Username may only contain letters, digits and @/./+/-/_".to_string(),
            ));
        }

        let email = self.email.trim();
        if !email.contains('@') {
            return Err(AppError::InvalidInput("Email address is invalid".to_string()));
        }

        for (field, value) in [("First name", &self.first_name), ("Last name", &self.last_name)] {
            let value = value.trim();
            if value.is_empty() {
                return Err(AppError::InvalidInput(format!("{} is required", field)));
            }
            if value.chars().count() > MAX_NAME_LEN {
                return Err(AppError::InvalidInput(format!(
                    "{} cannot exceed {} characters",
                    field, MAX_NAME_LEN
                )));
            }
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.password != self.password_confirmation {
            return Err(AppError::InvalidInput("Passwords do not match".to_string()));
        }
        if !self.accept_terms {
            return Err(AppError::InvalidInput(
                "You must accept the terms and conditions".to_string(),
            ));
        }
        Ok(())
    }
}

/// An authenticated user and the bearer token of their session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: Uuid,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Unparseable hashes never verify
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Creates the account with accepted terms and opens a session for it
pub async fn register(
    store: &dyn Store,
    config: &Config,
    registration: Registration,
) -> AppResult<Session> {
    registration.validate()?;

    let username = registration.username.trim().to_string();
    if store.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }
    let email = registration.email.trim().to_string();
    if store.email_in_use(&email).await? {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let is_staff = config.is_staff_username(&username);
    let user = store
        .create_user(
            NewUser {
                username,
                email,
                first_name: registration.first_name.trim().to_string(),
                last_name: registration.last_name.trim().to_string(),
                password_hash: hash_password(&registration.password)?,
                is_staff,
            },
            TERMS_VERSION,
        )
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, is_staff, "Registered user");

    open_session(store, user).await
}

pub async fn login(store: &dyn Store, username: &str, password: &str) -> AppResult<Session> {
    let user = store
        .find_user_by_username(username.trim())
        .await?
        .filter(|user| verify_password(password, &user.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    tracing::info!(user_id = user.id, "User logged in");

    open_session(store, user).await
}

pub async fn logout(store: &dyn Store, token: Uuid) -> AppResult<()> {
    store.delete_session(token).await
}

async fn open_session(store: &dyn Store, user: User) -> AppResult<Session> {
    let token = Uuid::new_v4();
    store.create_session(user.id, token).await?;
    Ok(Session { user, token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountStore, MemoryStore};

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: "Henry".to_string(),
            last_name: "Jones".to_string(),
            password: "fortune&glory".to_string(),
            password_confirmation: "fortune&glory".to_string(),
            accept_terms: true,
        }
    }

    #[test]
    fn test_validation_rules() {
        assert!(registration("indy").validate().is_ok());
        assert!(registration("in dy").validate().is_err());
        assert!(registration("").validate().is_err());
        assert!(registration("indy.jones+1@x").validate().is_ok());

        let mut form = registration("indy");
        form.accept_terms = false;
        assert!(form.validate().is_err());

        let mut form = registration("indy");
        form.password_confirmation = "different".to_string();
        assert!(form.validate().is_err());

        let mut form = registration("indy");
        form.password = "short".to_string();
        form.password_confirmation = "short".to_string();
        assert!(form.validate().is_err());

        let mut form = registration("indy");
        form.email = "no-at-sign".to_string();
        assert!(form.validate().is_err());

        let mut form = registration("indy");
        form.last_name = " ".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("fortune&glory").unwrap();
        assert!(verify_password("fortune&glory", &hash));
        assert!(!verify_password("snakes", &hash));
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_register_accepts_terms_and_opens_session() {
        let store = MemoryStore::new();
        let config = Config {
            staff_usernames: vec!["curator".to_string()],
            ..Config::default()
        };

        let session = register(&store, &config, registration("indy")).await.unwrap();
        assert!(!session.user.is_staff);

        let profile = store.ensure_profile(session.user.id).await.unwrap();
        assert!(profile.accepted_terms);
        assert_eq!(profile.terms_version, TERMS_VERSION);

        let found = store.find_session_user(session.token).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(session.user.id));

        let staff = register(&store, &config, registration("curator")).await.unwrap();
        assert!(staff.user.is_staff);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let store = MemoryStore::new();
        let config = Config::default();
        register(&store, &config, registration("indy")).await.unwrap();

        let result = register(&store, &config, registration("indy")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let mut form = registration("marion");
        form.email = "INDY@example.com".to_string();
        let result = register(&store, &config, form).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let store = MemoryStore::new();
        register(&store, &Config::default(), registration("indy"))
            .await
            .unwrap();

        let result = login(&store, "indy", "wrong-password").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        let result = login(&store, "nobody", "fortune&glory").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let session = login(&store, "indy", "fortune&glory").await.unwrap();
        logout(&store, session.token).await.unwrap();
        assert!(store.find_session_user(session.token).await.unwrap().is_none());
    }
}
