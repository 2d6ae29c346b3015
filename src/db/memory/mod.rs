use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    account::display_name, Conversation, CustomList, DbId, Genre, Message, Movie, MovieSortKey,
    MovieSummary, Notification, PartyChatMessage, Person, PersonRole, Profile, Rating, Review,
    User, ViewingRecord, WatchParty,
};

mod accounts;
mod catalog;
mod engagement;
mod lists;
mod recommendations;
mod social;
mod watch_parties;

/// Store that keeps every table in process memory.
///
/// Used when no database is configured and by the test suites. A single
/// `RwLock` guards all tables, so every write is atomic with respect to
/// every other operation.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pairs are keyed `(user_id, movie_id)`
#[derive(Default)]
pub(crate) struct Tables {
    last_id: DbId,
    users: BTreeMap<DbId, User>,
    profiles: BTreeMap<DbId, Profile>,
    sessions: HashMap<Uuid, DbId>,
    genres: BTreeMap<DbId, Genre>,
    directors: BTreeMap<DbId, Person>,
    actors: BTreeMap<DbId, Person>,
    movies: BTreeMap<DbId, Movie>,
    ratings: BTreeMap<(DbId, DbId), Rating>,
    reviews: BTreeMap<(DbId, DbId), Review>,
    favorites: BTreeMap<(DbId, DbId), DateTime<Utc>>,
    watch_later: BTreeMap<(DbId, DbId), DateTime<Utc>>,
    views: BTreeMap<(DbId, DbId), ViewingRecord>,
    lists: BTreeMap<DbId, CustomList>,
    conversations: BTreeMap<DbId, Conversation>,
    messages: BTreeMap<DbId, Message>,
    notifications: BTreeMap<DbId, Notification>,
    parties: BTreeMap<DbId, WatchParty>,
    party_messages: BTreeMap<DbId, PartyChatMessage>,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn people(&self, role: PersonRole) -> &BTreeMap<DbId, Person> {
        match role {
            PersonRole::Director => &self.directors,
            PersonRole::Actor => &self.actors,
        }
    }

    fn people_mut(&mut self, role: PersonRole) -> &mut BTreeMap<DbId, Person> {
        match role {
            PersonRole::Director => &mut self.directors,
            PersonRole::Actor => &mut self.actors,
        }
    }

    /// Mean score and count for a movie
    fn rating_stats(&self, movie_id: DbId) -> (Option<f64>, i64) {
        let (sum, count) = self
            .ratings
            .values()
            .filter(|rating| rating.movie_id == movie_id)
            .fold((0i64, 0i64), |(sum, count), rating| {
                (sum + rating.score as i64, count + 1)
            });

        if count == 0 {
            (None, 0)
        } else {
            (Some(sum as f64 / count as f64), count)
        }
    }

    fn summary(&self, movie: &Movie) -> MovieSummary {
        let (average_rating, rating_count) = self.rating_stats(movie.id);
        MovieSummary {
            id: movie.id,
            title: movie.title.clone(),
            year: movie.year,
            poster_url: movie.poster_url.clone(),
            average_rating,
            rating_count,
        }
    }

    fn sort_key(&self, movie: &Movie) -> MovieSortKey {
        MovieSortKey {
            id: movie.id,
            title: movie.title.clone(),
            year: movie.year,
            added_at: movie.added_at,
            average_rating: self.rating_stats(movie.id).0,
        }
    }

    fn summaries(&self, movie_ids: impl IntoIterator<Item = DbId>) -> Vec<MovieSummary> {
        movie_ids
            .into_iter()
            .filter_map(|id| self.movies.get(&id))
            .map(|movie| self.summary(movie))
            .collect()
    }

    fn in_genre(&self, movie_id: DbId, genre_id: DbId) -> bool {
        self.movies
            .get(&movie_id)
            .is_some_and(|movie| movie.genre_ids.contains(&genre_id))
    }

    fn author_name(&self, user_id: DbId) -> String {
        self.users
            .get(&user_id)
            .map(|user| display_name(&user.username, &user.first_name, &user.last_name))
            .unwrap_or_default()
    }

    fn username(&self, user_id: DbId) -> String {
        self.users
            .get(&user_id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }
}

/// Case-insensitive substring match
pub(crate) fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}
