use chrono::Utc;

use super::{MemoryStore, Tables};
use crate::{
    db::ListStore,
    error::{AppError, AppResult},
    models::{CustomList, DbId, NewList},
};

impl Tables {
    fn list_mut(&mut self, list_id: DbId) -> AppResult<&mut CustomList> {
        self.lists
            .get_mut(&list_id)
            .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))
    }
}

#[async_trait::async_trait]
impl ListStore for MemoryStore {
    async fn create_list(&self, list: NewList) -> AppResult<CustomList> {
        let mut tables = self.tables.write().await;
        let created = CustomList {
            id: tables.next_id(),
            user_id: list.user_id,
            name: list.name,
            description: list.description,
            public: list.public,
            created_at: Utc::now(),
            movie_ids: vec![],
        };
        tables.lists.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_list(&self, id: DbId) -> AppResult<Option<CustomList>> {
        Ok(self.tables.read().await.lists.get(&id).cloned())
    }

    async fn user_lists(&self, user_id: DbId) -> AppResult<Vec<CustomList>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lists
            .values()
            .rev()
            .filter(|list| list.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_list_movie(&self, list_id: DbId, movie_id: DbId) -> AppResult<CustomList> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&movie_id) {
            return Err(AppError::NotFound(format!("Movie {} not found", movie_id)));
        }
        let list = tables.list_mut(list_id)?;
        if !list.movie_ids.contains(&movie_id) {
            list.movie_ids.push(movie_id);
        }
        Ok(list.clone())
    }

    async fn remove_list_movie(&self, list_id: DbId, movie_id: DbId) -> AppResult<CustomList> {
        let mut tables = self.tables.write().await;
        let list = tables.list_mut(list_id)?;
        list.movie_ids.retain(|id| *id != movie_id);
        Ok(list.clone())
    }

    async fn delete_list(&self, list_id: DbId) -> AppResult<bool> {
        Ok(self.tables.write().await.lists.remove(&list_id).is_some())
    }
}
