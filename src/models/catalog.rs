use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt::Display, str::FromStr};

use super::DbId;
use crate::error::AppError;

pub const MIN_YEAR: i32 = 1888;
pub const MAX_YEAR: i32 = 2030;
pub const MAX_DURATION_MINUTES: i32 = 400;

/// A cinematic genre such as "Aventura" or "Drama"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: DbId,
    pub name: String,
    pub description: String,
}

/// Directors and actors share the same shape and live in separate tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonRole {
    Director,
    Actor,
}

impl PersonRole {
    pub fn label(&self) -> &'static str {
        match self {
            PersonRole::Director => "director",
            PersonRole::Actor => "actor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: DbId,
    pub name: String,
    pub biography: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: String,
}

/// MPAA-style age classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Classification {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[default]
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::G => "G",
            Classification::Pg => "PG",
            Classification::Pg13 => "PG-13",
            Classification::R => "R",
            Classification::Nc17 => "NC-17",
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Classification {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "G" => Ok(Classification::G),
            "PG" => Ok(Classification::Pg),
            "PG-13" => Ok(Classification::Pg13),
            "R" => Ok(Classification::R),
            "NC-17" => Ok(Classification::Nc17),
            other => Err(AppError::InvalidInput(format!(
                "Unknown classification '{}'",
                other
            ))),
        }
    }
}

/// A catalog movie with its relations flattened to ids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
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
    pub classification: Classification,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub genre_ids: Vec<DbId>,
    pub actor_ids: Vec<DbId>,
}

/// Input for creating a movie, either from staff or from the TMDB importer
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    pub synopsis: String,
    pub year: i32,
    pub duration_minutes: i32,
    #[serde(default)]
    pub director_id: Option<DbId>,
    pub country: String,
    pub language: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub classification: Classification,
    pub genre_ids: Vec<DbId>,
    #[serde(default)]
    pub actor_ids: Vec<DbId>,
}

impl NewMovie {
    /// Field rules applied to staff-submitted movies
    pub fn validate(&self) -> Result<(), AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput("Title is required".to_string()));
        }
        if title.chars().count() > 300 {
            return Err(AppError::InvalidInput(
                "Title cannot exceed 300 characters".to_string(),
            ));
        }
        if self.synopsis.trim().is_empty() {
            return Err(AppError::InvalidInput("Synopsis is required".to_string()));
        }
        if self.year < MIN_YEAR {
            return Err(AppError::InvalidInput(format!(
                "Year cannot be earlier than {}",
                MIN_YEAR
            )));
        }
        if self.year > MAX_YEAR {
            return Err(AppError::InvalidInput(format!(
                "Year cannot be later than {}",
                MAX_YEAR
            )));
        }
        if self.duration_minutes < 1 {
            return Err(AppError::InvalidInput(
                "Duration must be at least 1 minute".to_string(),
            ));
        }
        if self.duration_minutes > MAX_DURATION_MINUTES {
            return Err(AppError::InvalidInput(format!(
                "Duration cannot exceed {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        if self.genre_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one genre is required".to_string(),
            ));
        }
        if self.budget.is_some_and(|b| b < 0) || self.revenue.is_some_and(|r| r < 0) {
            return Err(AppError::InvalidInput(
                "Budget and revenue cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Listing row: a movie with its rating aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: DbId,
    pub title: String,
    pub year: i32,
    pub poster_url: Option<String>,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}

/// Filter for catalog listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    /// Only movies tagged with this genre
    pub genre_id: Option<DbId>,
    /// Case-insensitive substring matched against title, original title and synopsis
    pub text: Option<String>,
    /// Also match `text` against genre names and the director's name
    pub match_credits: bool,
}

/// Sort orders for catalog listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovieOrder {
    #[default]
    Az,
    Za,
    /// Release year, newest first
    Recent,
    /// Release year, oldest first
    Oldest,
    /// Mean rating, best first; unrated last
    Best,
    /// Mean rating, worst first; unrated last
    Worst,
    /// Most recently added to the catalog
    Newest,
    /// Release year descending then title
    Chronological,
}

impl MovieOrder {
    /// Maps the public `order` query value; unknown values fall back to A-Z
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("za") => MovieOrder::Za,
            Some("reciente") | Some("recent") => MovieOrder::Recent,
            Some("antiguo") | Some("oldest") => MovieOrder::Oldest,
            Some("mejor") | Some("best") => MovieOrder::Best,
            Some("peor") | Some("worst") => MovieOrder::Worst,
            _ => MovieOrder::Az,
        }
    }

    /// Total order used by the in-memory store; ids break every tie
    pub fn compare(&self, a: &MovieSortKey, b: &MovieSortKey) -> Ordering {
        let primary = match self {
            MovieOrder::Az => a.title.cmp(&b.title),
            MovieOrder::Za => b.title.cmp(&a.title),
            MovieOrder::Recent => b.year.cmp(&a.year).then(b.added_at.cmp(&a.added_at)),
            MovieOrder::Oldest => a.year.cmp(&b.year).then(a.added_at.cmp(&b.added_at)),
            MovieOrder::Best => {
                rating_cmp(a.average_rating, b.average_rating, true).then(b.year.cmp(&a.year))
            }
            MovieOrder::Worst => {
                rating_cmp(a.average_rating, b.average_rating, false).then(a.year.cmp(&b.year))
            }
            MovieOrder::Newest => {
                return b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id));
            }
            MovieOrder::Chronological => b.year.cmp(&a.year).then(a.title.cmp(&b.title)),
        };
        primary.then(a.id.cmp(&b.id))
    }
}

/// Unrated movies sort after rated ones in both directions
fn rating_cmp(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Fields a listing can be ordered by
#[derive(Debug, Clone)]
pub struct MovieSortKey {
    pub id: DbId,
    pub title: String,
    pub year: i32,
    pub added_at: DateTime<Utc>,
    pub average_rating: Option<f64>,
}

/// Mean rating as displayed: one decimal, zero when unrated
pub fn display_rating(average: Option<f64>) -> f64 {
    average.map(|avg| (avg * 10.0).round() / 10.0).unwrap_or(0.0)
}
