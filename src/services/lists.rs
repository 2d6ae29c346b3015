use serde::{Deserialize, Serialize};

use crate::{
    db::{ListStore, Store},
    error::{AppError, AppResult},
    models::{CustomList, DbId, MovieSummary, NewList},
    services::{
        catalog::{require_movie, summaries_for},
        required_text,
    },
};

const MAX_LIST_NAME_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct ListForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDetail {
    pub list: CustomList,
    pub movies: Vec<MovieSummary>,
}

pub async fn user_lists(store: &dyn Store, user_id: DbId) -> AppResult<Vec<CustomList>> {
    store.user_lists(user_id).await
}

pub async fn create_list(store: &dyn Store, user_id: DbId, form: ListForm) -> AppResult<CustomList> {
    let name = required_text("Name", &form.name, Some(MAX_LIST_NAME_LEN))?;
    let list = store
        .create_list(NewList {
            user_id,
            name,
            description: form.description.trim().to_string(),
            public: form.public,
        })
        .await?;

    tracing::info!(user_id, list_id = list.id, public = list.public, "Created list");
    Ok(list)
}

/// Private lists are indistinguishable from missing ones to everyone but the owner
pub async fn view_list(
    store: &dyn Store,
    list_id: DbId,
    viewer: Option<DbId>,
) -> AppResult<ListDetail> {
    let list = store
        .find_list(list_id)
        .await?
        .filter(|list| list.visible_to(viewer))
        .ok_or_else(|| not_found(list_id))?;

    let movies = summaries_for(store, &list.movie_ids).await?;
    Ok(ListDetail { list, movies })
}

/// Adding a movie twice keeps a single entry
pub async fn add_movie(
    store: &dyn Store,
    list_id: DbId,
    owner_id: DbId,
    movie_id: DbId,
) -> AppResult<CustomList> {
    owned_list(store, list_id, owner_id).await?;
    require_movie(store, movie_id).await?;

    let list = store.add_list_movie(list_id, movie_id).await?;
    tracing::info!(list_id, movie_id, "Added movie to list");
    Ok(list)
}

pub async fn remove_movie(
    store: &dyn Store,
    list_id: DbId,
    owner_id: DbId,
    movie_id: DbId,
) -> AppResult<CustomList> {
    owned_list(store, list_id, owner_id).await?;

    let list = store.remove_list_movie(list_id, movie_id).await?;
    tracing::info!(list_id, movie_id, "Removed movie from list");
    Ok(list)
}

pub async fn delete_list(store: &dyn Store, list_id: DbId, owner_id: DbId) -> AppResult<()> {
    owned_list(store, list_id, owner_id).await?;
    store.delete_list(list_id).await?;
    tracing::info!(list_id, user_id = owner_id, "Deleted list");
    Ok(())
}

async fn owned_list(store: &dyn Store, list_id: DbId, owner_id: DbId) -> AppResult<CustomList> {
    store
        .find_list(list_id)
        .await?
        .filter(|list| list.user_id == owner_id)
        .ok_or_else(|| not_found(list_id))
}

fn not_found(list_id: DbId) -> AppError {
    AppError::NotFound(format!("List {} not found", list_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, services::test_support};

    fn form(name: &str, public: bool) -> ListForm {
        ListForm {
            name: name.to_string(),
            description: String::new(),
            public,
        }
    }

    #[tokio::test]
    async fn test_private_list_hidden_from_others() {
        let store = MemoryStore::new();
        let owner = test_support::user(&store, "indy").await;
        let other = test_support::user(&store, "marion").await;
        let list = create_list(&store, owner.id, form("Secret", false)).await.unwrap();

        assert!(view_list(&store, list.id, Some(owner.id)).await.is_ok());
        let result = view_list(&store, list.id, Some(other.id)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(view_list(&store, list.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_add_is_idempotent_and_owner_only() {
        let store = MemoryStore::new();
        let genre = test_support::genre(&store, "Aventura").await;
        let movie = test_support::movie(&store, "Hook", vec![genre.id]).await;
        let owner = test_support::user(&store, "indy").await;
        let other = test_support::user(&store, "marion").await;
        let list = create_list(&store, owner.id, form("Faves", true)).await.unwrap();

        add_movie(&store, list.id, owner.id, movie.id).await.unwrap();
        let list_after = add_movie(&store, list.id, owner.id, movie.id).await.unwrap();
        assert_eq!(list_after.movie_ids, vec![movie.id]);

        let detail = view_list(&store, list.id, None).await.unwrap();
        assert_eq!(detail.movies.len(), 1);

        let result = add_movie(&store, list.id, other.id, movie.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        let result = delete_list(&store, list.id, other.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let emptied = remove_movie(&store, list.id, owner.id, movie.id).await.unwrap();
        assert!(emptied.movie_ids.is_empty());

        delete_list(&store, list.id, owner.id).await.unwrap();
        assert!(user_lists(&store, owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_name_required() {
        let store = MemoryStore::new();
        let owner = test_support::user(&store, "indy").await;
        let result = create_list(&store, owner.id, form("  ", false)).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
