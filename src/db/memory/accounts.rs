use chrono::Utc;
use uuid::Uuid;

use super::{contains_ci, MemoryStore, Tables};
use crate::{
    db::AccountStore,
    error::{AppError, AppResult},
    models::{DbId, NewUser, Profile, PublicUser, User, UserActivity},
};

impl Tables {
    fn directory(&self, exclude: DbId, text: Option<&str>) -> Vec<&User> {
        let needle = text.map(str::to_lowercase);
        self.users
            .values()
            .filter(|user| user.id != exclude)
            .filter(|user| match &needle {
                Some(needle) => {
                    contains_ci(&user.username, needle)
                        || contains_ci(&user.first_name, needle)
                        || contains_ci(&user.last_name, needle)
                }
                None => true,
            })
            .collect()
    }

    fn activity(&self, user: &User) -> UserActivity {
        let rating_count = self.ratings.keys().filter(|(u, _)| *u == user.id).count();
        let review_count = self.reviews.keys().filter(|(u, _)| *u == user.id).count();
        let favorite_count = self.favorites.keys().filter(|(u, _)| *u == user.id).count();
        UserActivity {
            user: PublicUser::from(user),
            rating_count: rating_count as i64,
            review_count: review_count as i64,
            favorite_count: favorite_count as i64,
        }
    }
}

#[async_trait::async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, user: NewUser, terms_version: &str) -> AppResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }
        let email = user.email.to_lowercase();
        if tables.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            joined_at: now,
        };
        tables.users.insert(id, created.clone());
        tables.profiles.insert(
            id,
            Profile {
                user_id: id,
                accepted_terms: true,
                accepted_terms_at: Some(now),
                terms_version: terms_version.to_string(),
            },
        );

        Ok(created)
    }

    async fn find_user(&self, id: DbId) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn email_in_use(&self, email: &str) -> AppResult<bool> {
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .any(|user| user.email.to_lowercase() == email))
    }

    async fn ensure_profile(&self, user_id: DbId) -> AppResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables.profiles.entry(user_id).or_insert_with(|| Profile {
            user_id,
            accepted_terms: false,
            accepted_terms_at: None,
            terms_version: crate::models::account::TERMS_VERSION.to_string(),
        });
        Ok(profile.clone())
    }

    async fn create_session(&self, user_id: DbId, token: Uuid) -> AppResult<()> {
        self.tables.write().await.sessions.insert(token, user_id);
        Ok(())
    }

    async fn find_session_user(&self, token: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(&token)
            .and_then(|user_id| tables.users.get(user_id))
            .cloned())
    }

    async fn delete_session(&self, token: Uuid) -> AppResult<()> {
        self.tables.write().await.sessions.remove(&token);
        Ok(())
    }

    async fn count_users(&self) -> AppResult<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn count_user_directory(&self, exclude: DbId, text: Option<&str>) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.directory(exclude, text).len() as u64)
    }

    async fn user_directory(
        &self,
        exclude: DbId,
        text: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<UserActivity>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<UserActivity> = tables
            .directory(exclude, text)
            .into_iter()
            .map(|user| tables.activity(user))
            .collect();

        rows.sort_by(|a, b| {
            b.rating_count
                .cmp(&a.rating_count)
                .then(b.review_count.cmp(&a.review_count))
                .then(a.user.id.cmp(&b.user.id))
        });

        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
