use sqlx::FromRow;
use uuid::Uuid;

use super::{
    constraint_error, like_pattern,
    rows::{ProfileRow, UserRow},
    PgStore,
};
use crate::{
    db::AccountStore,
    error::AppResult,
    models::{account::TERMS_VERSION, DbId, NewUser, Profile, PublicUser, User, UserActivity},
};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, is_staff, joined_at";

#[derive(Debug, FromRow)]
struct ActivityRow {
    #[sqlx(flatten)]
    user: UserRow,
    rating_count: i64,
    review_count: i64,
    favorite_count: i64,
}

impl From<ActivityRow> for UserActivity {
    fn from(row: ActivityRow) -> Self {
        let user = User::from(row.user);
        Self {
            user: PublicUser::from(&user),
            rating_count: row.rating_count,
            review_count: row.review_count,
            favorite_count: row.favorite_count,
        }
    }
}

#[async_trait::async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, user: NewUser, terms_version: &str) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "An account with that username or email"))?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, accepted_terms, accepted_terms_at, terms_version)
            VALUES ($1, TRUE, NOW(), $2)
            "#,
        )
        .bind(row.id)
        .bind(terms_version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_user(&self, id: DbId) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn email_in_use(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn ensure_profile(&self, user_id: DbId) -> AppResult<Profile> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, terms_version)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(TERMS_VERSION)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Profile"))?;

        let row: ProfileRow = sqlx::query_as(
            r#"
            SELECT user_id, accepted_terms, accepted_terms_at, terms_version
            FROM user_profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn create_session(&self, user_id: DbId, token: Uuid) -> AppResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| constraint_error(e, "Session"))?;
        Ok(())
    }

    async fn find_session_user(&self, token: Uuid) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                   u.password_hash, u.is_staff, u.joined_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn delete_session(&self, token: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_users(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_user_directory(&self, exclude: DbId, text: Option<&str>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users u
            WHERE u.id <> $1
              AND ($2::text IS NULL
                   OR u.username ILIKE $2 OR u.first_name ILIKE $2 OR u.last_name ILIKE $2)
            "#,
        )
        .bind(exclude)
        .bind(text.map(like_pattern))
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn user_directory(
        &self,
        exclude: DbId,
        text: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<UserActivity>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                   u.password_hash, u.is_staff, u.joined_at,
                   (SELECT COUNT(*) FROM ratings r WHERE r.user_id = u.id) AS rating_count,
                   (SELECT COUNT(*) FROM reviews v WHERE v.user_id = u.id) AS review_count,
                   (SELECT COUNT(*) FROM favorites f WHERE f.user_id = u.id) AS favorite_count
            FROM users u
            WHERE u.id <> $1
              AND ($2::text IS NULL
                   OR u.username ILIKE $2 OR u.first_name ILIKE $2 OR u.last_name ILIKE $2)
            ORDER BY rating_count DESC, review_count DESC, u.id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(exclude)
        .bind(text.map(like_pattern))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserActivity::from).collect())
    }
}
