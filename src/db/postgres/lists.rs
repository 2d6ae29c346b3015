use super::{
    constraint_error,
    rows::{ListRow, LIST_SELECT},
    PgStore,
};
use crate::{
    db::ListStore,
    error::{AppError, AppResult},
    models::{CustomList, DbId, NewList},
};

impl PgStore {
    async fn require_list(&self, list_id: DbId) -> AppResult<CustomList> {
        self.find_list(list_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))
    }
}

#[async_trait::async_trait]
impl ListStore for PgStore {
    async fn create_list(&self, list: NewList) -> AppResult<CustomList> {
        let id: DbId = sqlx::query_scalar(
            r#"
            INSERT INTO custom_lists (user_id, name, description, public)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(list.user_id)
        .bind(&list.name)
        .bind(&list.description)
        .bind(list.public)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "List"))?;

        self.require_list(id).await
    }

    async fn find_list(&self, id: DbId) -> AppResult<Option<CustomList>> {
        let row: Option<ListRow> = sqlx::query_as(&format!("{LIST_SELECT} WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CustomList::from))
    }

    async fn user_lists(&self, user_id: DbId) -> AppResult<Vec<CustomList>> {
        let rows: Vec<ListRow> = sqlx::query_as(&format!(
            "{LIST_SELECT} WHERE l.user_id = $1 ORDER BY l.created_at DESC, l.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CustomList::from).collect())
    }

    async fn add_list_movie(&self, list_id: DbId, movie_id: DbId) -> AppResult<CustomList> {
        self.require_list(list_id).await?;
        sqlx::query(
            r#"
            INSERT INTO custom_list_movies (list_id, movie_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(list_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "List entry"))?;

        self.require_list(list_id).await
    }

    async fn remove_list_movie(&self, list_id: DbId, movie_id: DbId) -> AppResult<CustomList> {
        self.require_list(list_id).await?;
        sqlx::query("DELETE FROM custom_list_movies WHERE list_id = $1 AND movie_id = $2")
            .bind(list_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        self.require_list(list_id).await
    }

    async fn delete_list(&self, list_id: DbId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM custom_lists WHERE id = $1")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
