use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Conversation, CustomList, DbId, Genre, JoinOutcome, Message, Movie, MovieFilter,
        MovieOrder, MovieSummary, NewList, NewMovie, NewNotification, NewPerson, NewUser,
        NewWatchParty, Notification, PartyChatMessage, PartyStatus, Person, PersonRole,
        PlaybackUpdate, Profile, Rating, Review, Score, Upserted, User, UserActivity,
        ViewingRecord, WatchParty,
    },
};

/// Accounts, profiles and login sessions
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts the user together with a profile that accepted `terms_version` now.
    /// Duplicate usernames or emails yield `AppError::Conflict`.
    async fn create_user(&self, user: NewUser, terms_version: &str) -> AppResult<User>;

    async fn find_user(&self, id: DbId) -> AppResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Case-insensitive
    async fn email_in_use(&self, email: &str) -> AppResult<bool>;

    /// Returns the profile, creating an unaccepted one for accounts that lack it
    async fn ensure_profile(&self, user_id: DbId) -> AppResult<Profile>;

    async fn create_session(&self, user_id: DbId, token: Uuid) -> AppResult<()>;

    async fn find_session_user(&self, token: Uuid) -> AppResult<Option<User>>;

    async fn delete_session(&self, token: Uuid) -> AppResult<()>;

    async fn count_users(&self) -> AppResult<u64>;

    /// Users other than `exclude` whose username or names contain `text`
    async fn count_user_directory(&self, exclude: DbId, text: Option<&str>) -> AppResult<u64>;

    /// Ordered by rating count desc, review count desc, id
    async fn user_directory(
        &self,
        exclude: DbId,
        text: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<UserActivity>>;
}

/// Genres, people and movies
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Alphabetical
    async fn list_genres(&self) -> AppResult<Vec<Genre>>;

    async fn find_genre(&self, id: DbId) -> AppResult<Option<Genre>>;

    /// Case-insensitive exact match
    async fn find_genre_by_name(&self, name: &str) -> AppResult<Option<Genre>>;

    async fn create_genre(&self, name: &str, description: &str) -> AppResult<Genre>;

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre>;

    async fn find_genres(&self, ids: &[DbId]) -> AppResult<Vec<Genre>>;

    async fn create_person(&self, role: PersonRole, person: NewPerson) -> AppResult<Person>;

    /// Matches on exact name; `nationality` is only used when creating
    async fn get_or_create_person(
        &self,
        role: PersonRole,
        name: &str,
        nationality: &str,
    ) -> AppResult<Person>;

    async fn find_people(&self, role: PersonRole, ids: &[DbId]) -> AppResult<Vec<Person>>;

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie>;

    async fn find_movie(&self, id: DbId) -> AppResult<Option<Movie>>;

    async fn movie_exists(&self, title: &str, year: i32) -> AppResult<bool>;

    async fn count_movies(&self, filter: &MovieFilter) -> AppResult<u64>;

    async fn list_movies(
        &self,
        filter: &MovieFilter,
        order: MovieOrder,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<MovieSummary>>;

    /// Mean score and number of ratings
    async fn rating_stats(&self, movie_id: DbId) -> AppResult<(Option<f64>, i64)>;
}

/// Ratings, reviews, favorites, watch-later and viewing history
#[async_trait::async_trait]
pub trait EngagementStore: Send + Sync {
    async fn upsert_rating(
        &self,
        user_id: DbId,
        movie_id: DbId,
        score: Score,
    ) -> AppResult<Upserted<Rating>>;

    async fn find_rating(&self, user_id: DbId, movie_id: DbId) -> AppResult<Option<Rating>>;

    /// Newest first
    async fn user_ratings(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<Rating>>;

    async fn upsert_review(
        &self,
        user_id: DbId,
        movie_id: DbId,
        title: &str,
        body: &str,
    ) -> AppResult<Upserted<Review>>;

    /// Newest first
    async fn movie_reviews(&self, movie_id: DbId, limit: u64) -> AppResult<Vec<Review>>;

    async fn count_reviews(&self, movie_id: DbId) -> AppResult<i64>;

    /// Newest first
    async fn user_reviews(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<Review>>;

    /// Returns whether the movie is a favorite after the toggle
    async fn toggle_favorite(&self, user_id: DbId, movie_id: DbId) -> AppResult<bool>;

    /// Returns whether the movie is on the watch-later list after the toggle
    async fn toggle_watch_later(&self, user_id: DbId, movie_id: DbId) -> AppResult<bool>;

    async fn favorites(&self, user_id: DbId, limit: Option<u64>) -> AppResult<Vec<MovieSummary>>;

    async fn watch_later(&self, user_id: DbId) -> AppResult<Vec<MovieSummary>>;

    /// Records a viewing once per (user, movie); later calls return the first record
    async fn record_view(&self, user_id: DbId, movie_id: DbId) -> AppResult<Upserted<ViewingRecord>>;
}

/// Queries the recommendation selector is composed from
#[async_trait::async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn favorite_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>>;

    async fn rated_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>>;

    async fn viewed_movie_ids(&self, user_id: DbId) -> AppResult<Vec<DbId>>;

    /// The subset of `movie_ids` tagged with `genre_id`
    async fn filter_in_genre(&self, genre_id: DbId, movie_ids: &[DbId]) -> AppResult<Vec<DbId>>;

    /// Rated movies of the genre outside `exclude`, by mean desc, count desc, id
    async fn top_rated_in_genre(
        &self,
        genre_id: DbId,
        exclude: &HashSet<DbId>,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>>;

    /// Other users who rated the user's favorites of the genre, most matches first
    async fn similar_users(&self, user_id: DbId, genre_id: DbId, limit: usize)
        -> AppResult<Vec<DbId>>;

    /// Genre movies rated at least `min_score` by `peers`, by mean of those ratings desc, id
    async fn peer_favored_in_genre(
        &self,
        genre_id: DbId,
        peers: &[DbId],
        min_score: i16,
        exclude: &HashSet<DbId>,
        limit: usize,
    ) -> AppResult<Vec<MovieSummary>>;
}

/// Conversations, messages and notifications
#[async_trait::async_trait]
pub trait SocialStore: Send + Sync {
    /// A conversation with exactly these two participants
    async fn find_direct_conversation(&self, a: DbId, b: DbId) -> AppResult<Option<Conversation>>;

    async fn create_conversation(&self, participant_ids: &[DbId]) -> AppResult<Conversation>;

    async fn find_conversation(&self, id: DbId) -> AppResult<Option<Conversation>>;

    /// Most recently active first
    async fn user_conversations(&self, user_id: DbId) -> AppResult<Vec<Conversation>>;

    /// Appends a message and bumps the conversation's last activity
    async fn add_message(&self, conversation_id: DbId, sender_id: DbId, body: &str)
        -> AppResult<Message>;

    /// Chronological
    async fn conversation_messages(&self, conversation_id: DbId) -> AppResult<Vec<Message>>;

    async fn last_message(&self, conversation_id: DbId) -> AppResult<Option<Message>>;

    /// Unread messages sent by someone other than `reader`
    async fn unread_count(&self, conversation_id: DbId, reader: DbId) -> AppResult<i64>;

    /// Marks messages from others as read, returning how many changed
    async fn mark_conversation_read(&self, conversation_id: DbId, reader: DbId) -> AppResult<u64>;

    async fn create_notification(&self, notification: NewNotification) -> AppResult<Notification>;

    /// Newest first
    async fn user_notifications(&self, user_id: DbId) -> AppResult<Vec<Notification>>;

    /// Newest first
    async fn unread_notifications(&self, user_id: DbId, limit: u64)
        -> AppResult<Vec<Notification>>;

    async fn mark_notifications_read(&self, user_id: DbId) -> AppResult<u64>;
}

/// Watch parties, membership, playback and chat
#[async_trait::async_trait]
pub trait WatchPartyStore: Send + Sync {
    /// Inserts the party with its host as first participant
    async fn create_party(&self, party: NewWatchParty) -> AppResult<WatchParty>;

    async fn invite_code_exists(&self, code: &str) -> AppResult<bool>;

    async fn find_party(&self, id: DbId) -> AppResult<Option<WatchParty>>;

    async fn find_party_by_code(&self, code: &str) -> AppResult<Option<WatchParty>>;

    /// Hosted or joined, latest scheduled first
    async fn user_parties(&self, user_id: DbId) -> AppResult<Vec<WatchParty>>;

    /// Public waiting parties from `now` on that `user_id` is not part of, soonest first
    async fn public_upcoming_parties(
        &self,
        user_id: DbId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<WatchParty>>;

    /// Waiting parties for a movie from `now` on, soonest first
    async fn upcoming_parties_for_movie(
        &self,
        movie_id: DbId,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<WatchParty>>;

    /// Capacity check and insert happen atomically. A full party yields
    /// `AppError::Conflict`.
    async fn join_party(&self, party_id: DbId, user_id: DbId) -> AppResult<JoinOutcome>;

    /// Returns whether the user was a participant
    async fn leave_party(&self, party_id: DbId, user_id: DbId) -> AppResult<bool>;

    async fn update_playback(&self, party_id: DbId, update: PlaybackUpdate)
        -> AppResult<WatchParty>;

    async fn set_party_status(&self, party_id: DbId, status: PartyStatus)
        -> AppResult<WatchParty>;

    async fn add_party_message(
        &self,
        party_id: DbId,
        user_id: DbId,
        body: &str,
    ) -> AppResult<PartyChatMessage>;

    /// Chronological
    async fn party_messages(&self, party_id: DbId) -> AppResult<Vec<PartyChatMessage>>;
}

/// Custom movie lists
#[async_trait::async_trait]
pub trait ListStore: Send + Sync {
    async fn create_list(&self, list: NewList) -> AppResult<CustomList>;

    async fn find_list(&self, id: DbId) -> AppResult<Option<CustomList>>;

    /// Newest first
    async fn user_lists(&self, user_id: DbId) -> AppResult<Vec<CustomList>>;

    async fn add_list_movie(&self, list_id: DbId, movie_id: DbId) -> AppResult<CustomList>;

    async fn remove_list_movie(&self, list_id: DbId, movie_id: DbId) -> AppResult<CustomList>;

    async fn delete_list(&self, list_id: DbId) -> AppResult<bool>;
}

/// Everything the HTTP layer needs from persistence
pub trait Store:
    AccountStore
    + CatalogStore
    + EngagementStore
    + RecommendationSource
    + SocialStore
    + WatchPartyStore
    + ListStore
{
}

impl<T> Store for T where
    T: AccountStore
        + CatalogStore
        + EngagementStore
        + RecommendationSource
        + SocialStore
        + WatchPartyStore
        + ListStore
{
}
