use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::{
    error::{AppError, AppResult},
    models::{
        account::display_name, Conversation, CustomList, DbId, Genre, Message, Movie,
        MovieSummary, Notification, PartyChatMessage, Person, Profile, Rating, Review, Upserted,
        User, ViewingRecord, WatchParty,
    },
};

pub(super) const MOVIE_SELECT: &str = r#"
    SELECT m.id, m.title, m.original_title, m.synopsis, m.year, m.duration_minutes,
           m.director_id, m.country, m.language, m.poster_url, m.trailer_url,
           m.release_date, m.budget, m.revenue, m.classification, m.added_at, m.updated_at,
           ARRAY(SELECT mg.genre_id FROM movie_genres mg
                 WHERE mg.movie_id = m.id ORDER BY mg.genre_id) AS genre_ids,
           ARRAY(SELECT ma.actor_id FROM movie_actors ma
                 WHERE ma.movie_id = m.id ORDER BY ma.position, ma.actor_id) AS actor_ids
    FROM movies m
"#;

/// Movies left-joined with their rating aggregate as `r`
pub(super) const SUMMARY_SELECT: &str = r#"
    SELECT m.id, m.title, m.year, m.poster_url,
           r.average_rating, COALESCE(r.rating_count, 0) AS rating_count
    FROM movies m
    LEFT JOIN (
        SELECT movie_id, AVG(score)::float8 AS average_rating, COUNT(*) AS rating_count
        FROM ratings GROUP BY movie_id
    ) r ON r.movie_id = m.id
"#;

pub(super) const CONVERSATION_SELECT: &str = r#"
    SELECT c.id, c.created_at, c.last_activity,
           ARRAY(SELECT p.user_id FROM conversation_participants p
                 WHERE p.conversation_id = c.id ORDER BY p.user_id) AS participant_ids
    FROM conversations c
"#;

pub(super) const PARTY_SELECT: &str = r#"
    SELECT w.id, w.movie_id, w.host_id, w.name, w.description, w.scheduled_for,
           w.created_at, w.status, w.position_seconds, w.playing, w.playback_updated_at,
           w.public, w.max_participants, w.invite_code,
           ARRAY(SELECT p.user_id FROM watch_party_participants p
                 WHERE p.party_id = w.id ORDER BY p.joined_at, p.user_id) AS participant_ids
    FROM watch_parties w
"#;

pub(super) const LIST_SELECT: &str = r#"
    SELECT l.id, l.user_id, l.name, l.description, l.public, l.created_at,
           ARRAY(SELECT lm.movie_id FROM custom_list_movies lm
                 WHERE lm.list_id = l.id ORDER BY lm.added_at, lm.movie_id) AS movie_ids
    FROM custom_lists l
"#;

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            is_staff: row.is_staff,
            joined_at: row.joined_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ProfileRow {
    pub user_id: DbId,
    pub accepted_terms: bool,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub terms_version: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            accepted_terms: row.accepted_terms,
            accepted_terms_at: row.accepted_terms_at,
            terms_version: row.terms_version,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct GenreRow {
    pub id: DbId,
    pub name: String,
    pub description: String,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct PersonRow {
    pub id: DbId,
    pub name: String,
    pub biography: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: String,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            biography: row.biography,
            birth_date: row.birth_date,
            nationality: row.nationality,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct MovieRow {
    pub id: DbId,
    pub title: String,
    pub original_title: String,
    pub synopsis: String,
    pub year: i32,
    pub duration_minutes: i32,
    pub director_id: Option<DbId>,
    pub country: String,
    pub language: String,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub release_date: NaiveDate,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub classification: String,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub genre_ids: Vec<DbId>,
    pub actor_ids: Vec<DbId>,
}

impl TryFrom<MovieRow> for Movie {
    type Error = AppError;

    fn try_from(row: MovieRow) -> AppResult<Self> {
        let classification = row.classification.parse().map_err(|_| {
            AppError::Internal(format!(
                "Movie {} has unknown classification '{}'",
                row.id, row.classification
            ))
        })?;

        Ok(Self {
            id: row.id,
            title: row.title,
            original_title: row.original_title,
            synopsis: row.synopsis,
            year: row.year,
            duration_minutes: row.duration_minutes,
            director_id: row.director_id,
            country: row.country,
            language: row.language,
            poster_url: row.poster_url,
            trailer_url: row.trailer_url,
            release_date: row.release_date,
            budget: row.budget,
            revenue: row.revenue,
            classification,
            added_at: row.added_at,
            updated_at: row.updated_at,
            genre_ids: row.genre_ids,
            actor_ids: row.actor_ids,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct SummaryRow {
    pub id: DbId,
    pub title: String,
    pub year: i32,
    pub poster_url: Option<String>,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}

impl From<SummaryRow> for MovieSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            year: row.year,
            poster_url: row.poster_url,
            average_rating: row.average_rating,
            rating_count: row.rating_count,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct RatingRow {
    pub id: DbId,
    pub movie_id: DbId,
    pub user_id: DbId,
    pub score: i16,
    pub created_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: row.id,
            movie_id: row.movie_id,
            user_id: row.user_id,
            score: row.score,
            created_at: row.created_at,
        }
    }
}

/// Row returned by `INSERT ... ON CONFLICT DO UPDATE ... RETURNING (xmax = 0) AS created`
#[derive(Debug, FromRow)]
pub(super) struct UpsertedRating {
    #[sqlx(flatten)]
    pub rating: RatingRow,
    pub created: bool,
}

impl From<UpsertedRating> for Upserted<Rating> {
    fn from(row: UpsertedRating) -> Self {
        Upserted {
            record: row.rating.into(),
            created: row.created,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct UpsertedReview {
    #[sqlx(flatten)]
    pub review: ReviewRow,
    pub created: bool,
}

impl From<UpsertedReview> for Upserted<Review> {
    fn from(row: UpsertedReview) -> Self {
        Upserted {
            record: row.review.into(),
            created: row.created,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ReviewRow {
    pub id: DbId,
    pub movie_id: DbId,
    pub user_id: DbId,
    pub author: String,
    pub title: String,
    pub body: String,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            movie_id: row.movie_id,
            user_id: row.user_id,
            author: row.author,
            title: row.title,
            body: row.body,
            helpful_count: row.helpful_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ViewingRow {
    pub id: DbId,
    pub user_id: DbId,
    pub movie_id: DbId,
    pub viewed_at: DateTime<Utc>,
    pub minutes_watched: i32,
    pub completed: bool,
}

impl From<ViewingRow> for ViewingRecord {
    fn from(row: ViewingRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            viewed_at: row.viewed_at,
            minutes_watched: row.minutes_watched,
            completed: row.completed,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ListRow {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub movie_ids: Vec<DbId>,
}

impl From<ListRow> for CustomList {
    fn from(row: ListRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            public: row.public,
            created_at: row.created_at,
            movie_ids: row.movie_ids,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ConversationRow {
    pub id: DbId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub participant_ids: Vec<DbId>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            participant_ids: row.participant_ids,
            created_at: row.created_at,
            last_activity: row.last_activity,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct MessageRow {
    pub id: DbId,
    pub conversation_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            body: row.body,
            sent_at: row.sent_at,
            read: row.read,
            read_at: row.read_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct NotificationRow {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse()?,
            title: row.title,
            message: row.message,
            read: row.read,
            url: row.url,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct PartyRow {
    pub id: DbId,
    pub movie_id: DbId,
    pub host_id: DbId,
    pub name: String,
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub position_seconds: i32,
    pub playing: bool,
    pub playback_updated_at: DateTime<Utc>,
    pub public: bool,
    pub max_participants: i32,
    pub invite_code: String,
    pub participant_ids: Vec<DbId>,
}

impl TryFrom<PartyRow> for WatchParty {
    type Error = AppError;

    fn try_from(row: PartyRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            movie_id: row.movie_id,
            host_id: row.host_id,
            participant_ids: row.participant_ids,
            name: row.name,
            description: row.description,
            scheduled_for: row.scheduled_for,
            created_at: row.created_at,
            status: row.status.parse()?,
            position_seconds: row.position_seconds,
            playing: row.playing,
            playback_updated_at: row.playback_updated_at,
            public: row.public,
            max_participants: row.max_participants,
            invite_code: row.invite_code,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct PartyMessageRow {
    pub id: DbId,
    pub party_id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl From<PartyMessageRow> for PartyChatMessage {
    fn from(row: PartyMessageRow) -> Self {
        Self {
            id: row.id,
            party_id: row.party_id,
            user_id: row.user_id,
            author: display_name(&row.username, &row.first_name, &row.last_name),
            body: row.body,
            sent_at: row.sent_at,
        }
    }
}

/// Converts a batch of rows whose conversion can fail
pub(super) fn try_collect<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
