use chrono::Utc;

use super::{contains_ci, MemoryStore, Tables};
use crate::{
    db::CatalogStore,
    error::{AppError, AppResult},
    models::{
        DbId, Genre, Movie, MovieFilter, MovieOrder, MovieSummary, NewMovie, NewPerson, Person,
        PersonRole,
    },
};

impl Tables {
    fn matches(&self, movie: &Movie, filter: &MovieFilter) -> bool {
        if let Some(genre_id) = filter.genre_id {
            if !movie.genre_ids.contains(&genre_id) {
                return false;
            }
        }

        let Some(text) = filter.text.as_deref() else {
            return true;
        };
        let needle = text.to_lowercase();

        if contains_ci(&movie.title, &needle)
            || contains_ci(&movie.original_title, &needle)
            || contains_ci(&movie.synopsis, &needle)
        {
            return true;
        }

        if !filter.match_credits {
            return false;
        }

        let genre_match = movie
            .genre_ids
            .iter()
            .filter_map(|id| self.genres.get(id))
            .any(|genre| contains_ci(&genre.name, &needle));
        let director_match = movie
            .director_id
            .and_then(|id| self.directors.get(&id))
            .is_some_and(|director| contains_ci(&director.name, &needle));

        genre_match || director_match
    }

    fn missing_ids(&self, role: Option<PersonRole>, ids: &[DbId]) -> Option<DbId> {
        ids.iter().copied().find(|id| match role {
            Some(role) => !self.people(role).contains_key(id),
            None => !self.genres.contains_key(id),
        })
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let tables = self.tables.read().await;
        let mut genres: Vec<Genre> = tables.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn find_genre(&self, id: DbId) -> AppResult<Option<Genre>> {
        Ok(self.tables.read().await.genres.get(&id).cloned())
    }

    async fn find_genre_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let name = name.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .genres
            .values()
            .find(|genre| genre.name.to_lowercase() == name)
            .cloned())
    }

    async fn create_genre(&self, name: &str, description: &str) -> AppResult<Genre> {
        let mut tables = self.tables.write().await;
        if tables.genres.values().any(|genre| genre.name == name) {
            return Err(AppError::Conflict(format!("Genre '{}' already exists", name)));
        }
        let genre = Genre {
            id: tables.next_id(),
            name: name.to_string(),
            description: description.to_string(),
        };
        tables.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre> {
        let mut tables = self.tables.write().await;
        if let Some(genre) = tables.genres.values().find(|genre| genre.name == name) {
            return Ok(genre.clone());
        }
        let genre = Genre {
            id: tables.next_id(),
            name: name.to_string(),
            description: String::new(),
        };
        tables.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn find_genres(&self, ids: &[DbId]) -> AppResult<Vec<Genre>> {
        let tables = self.tables.read().await;
        let mut genres: Vec<Genre> = ids
            .iter()
            .filter_map(|id| tables.genres.get(id))
            .cloned()
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn create_person(&self, role: PersonRole, person: NewPerson) -> AppResult<Person> {
        let mut tables = self.tables.write().await;
        let created = Person {
            id: tables.next_id(),
            name: person.name,
            biography: person.biography,
            birth_date: person.birth_date,
            nationality: person.nationality,
        };
        tables.people_mut(role).insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_or_create_person(
        &self,
        role: PersonRole,
        name: &str,
        nationality: &str,
    ) -> AppResult<Person> {
        let mut tables = self.tables.write().await;
        if let Some(person) = tables.people(role).values().find(|p| p.name == name) {
            return Ok(person.clone());
        }
        let created = Person {
            id: tables.next_id(),
            name: name.to_string(),
            biography: String::new(),
            birth_date: None,
            nationality: nationality.to_string(),
        };
        tables.people_mut(role).insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_people(&self, role: PersonRole, ids: &[DbId]) -> AppResult<Vec<Person>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.people(role).get(id))
            .cloned()
            .collect())
    }

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut tables = self.tables.write().await;

        if let Some(id) = tables.missing_ids(None, &movie.genre_ids) {
            return Err(AppError::InvalidInput(format!("Unknown genre {}", id)));
        }
        if let Some(id) = tables.missing_ids(Some(PersonRole::Actor), &movie.actor_ids) {
            return Err(AppError::InvalidInput(format!("Unknown actor {}", id)));
        }
        if let Some(id) = movie.director_id {
            if !tables.directors.contains_key(&id) {
                return Err(AppError::InvalidInput(format!("Unknown director {}", id)));
            }
        }

        let mut genre_ids = movie.genre_ids;
        genre_ids.sort_unstable();
        genre_ids.dedup();
        let mut actor_ids = movie.actor_ids;
        actor_ids.dedup();

        let now = Utc::now();
        let created = Movie {
            id: tables.next_id(),
            title: movie.title,
            original_title: movie.original_title,
            synopsis: movie.synopsis,
            year: movie.year,
            duration_minutes: movie.duration_minutes,
            director_id: movie.director_id,
            country: movie.country,
            language: movie.language,
            poster_url: movie.poster_url,
            trailer_url: movie.trailer_url,
            release_date: movie.release_date,
            budget: movie.budget,
            revenue: movie.revenue,
            classification: movie.classification,
            added_at: now,
            updated_at: now,
            genre_ids,
            actor_ids,
        };
        tables.movies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_movie(&self, id: DbId) -> AppResult<Option<Movie>> {
        Ok(self.tables.read().await.movies.get(&id).cloned())
    }

    async fn movie_exists(&self, title: &str, year: i32) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .movies
            .values()
            .any(|movie| movie.title == title && movie.year == year))
    }

    async fn count_movies(&self, filter: &MovieFilter) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .movies
            .values()
            .filter(|movie| tables.matches(movie, filter))
            .count() as u64)
    }

    async fn list_movies(
        &self,
        filter: &MovieFilter,
        order: MovieOrder,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<MovieSummary>> {
        let tables = self.tables.read().await;
        let mut keys: Vec<_> = tables
            .movies
            .values()
            .filter(|movie| tables.matches(movie, filter))
            .map(|movie| tables.sort_key(movie))
            .collect();
        keys.sort_by(|a, b| order.compare(a, b));

        Ok(tables.summaries(
            keys.into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|key| key.id),
        ))
    }

    async fn rating_stats(&self, movie_id: DbId) -> AppResult<(Option<f64>, i64)> {
        Ok(self.tables.read().await.rating_stats(movie_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;
    use chrono::NaiveDate;

    fn new_movie(title: &str, year: i32, genre_ids: Vec<DbId>) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            original_title: String::new(),
            synopsis: format!("{} synopsis", title),
            year,
            duration_minutes: 100,
            director_id: None,
            country: "USA".to_string(),
            language: "EN".to_string(),
            poster_url: None,
            trailer_url: None,
            release_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            budget: None,
            revenue: None,
            classification: Classification::Pg13,
            genre_ids,
            actor_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_genre_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let genre = store.create_genre("Aventura", "").await.unwrap();
        let found = store.find_genre_by_name("aventura").await.unwrap();
        assert_eq!(found, Some(genre));
    }

    #[tokio::test]
    async fn test_get_or_create_genre_reuses_existing() {
        let store = MemoryStore::new();
        let first = store.get_or_create_genre("Drama").await.unwrap();
        let second = store.get_or_create_genre("Drama").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_genres().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_movie_rejects_unknown_genre() {
        let store = MemoryStore::new();
        let result = store.create_movie(new_movie("Ghost", 1990, vec![99])).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_filter_by_genre_and_text() {
        let store = MemoryStore::new();
        let adventure = store.create_genre("Aventura", "").await.unwrap();
        let drama = store.create_genre("Drama", "").await.unwrap();
        store
            .create_movie(new_movie("Jumanji", 1995, vec![adventure.id]))
            .await
            .unwrap();
        store
            .create_movie(new_movie("Hook", 1991, vec![adventure.id, drama.id]))
            .await
            .unwrap();
        store
            .create_movie(new_movie("Amadeus", 1984, vec![drama.id]))
            .await
            .unwrap();

        let filter = MovieFilter {
            genre_id: Some(adventure.id),
            ..Default::default()
        };
        assert_eq!(store.count_movies(&filter).await.unwrap(), 2);

        let listed = store
            .list_movies(&filter, MovieOrder::Az, 12, 0)
            .await
            .unwrap();
        let titles: Vec<&str> = listed.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Hook", "Jumanji"]);

        let filter = MovieFilter {
            text: Some("JUMAN".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_movies(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_credit_matching_needs_flag() {
        let store = MemoryStore::new();
        let adventure = store.create_genre("Aventura", "").await.unwrap();
        let spielberg = store
            .get_or_create_person(PersonRole::Director, "Steven Spielberg", "USA")
            .await
            .unwrap();
        let mut movie = new_movie("Hook", 1991, vec![adventure.id]);
        movie.director_id = Some(spielberg.id);
        store.create_movie(movie).await.unwrap();

        let mut filter = MovieFilter {
            text: Some("spielberg".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_movies(&filter).await.unwrap(), 0);
        filter.match_credits = true;
        assert_eq!(store.count_movies(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_movie_exists() {
        let store = MemoryStore::new();
        let adventure = store.create_genre("Aventura", "").await.unwrap();
        store
            .create_movie(new_movie("Hook", 1991, vec![adventure.id]))
            .await
            .unwrap();
        assert!(store.movie_exists("Hook", 1991).await.unwrap());
        assert!(!store.movie_exists("Hook", 1992).await.unwrap());
    }
}
