use serde::Serialize;
use std::num::IntErrorKind;

pub mod account;
pub mod catalog;
pub mod engagement;
pub mod list;
pub mod social;
pub mod tmdb;
pub mod watch_party;

pub use account::{NewUser, Profile, PublicUser, User, UserActivity};
pub use catalog::{
    Classification, Genre, Movie, MovieFilter, MovieOrder, MovieSortKey, MovieSummary, NewMovie,
    NewPerson, Person, PersonRole,
};
pub use engagement::{Rating, Review, Score, Upserted, ViewingRecord};
pub use list::{CustomList, NewList};
pub use social::{Conversation, Message, NewNotification, Notification, NotificationKind};
pub use tmdb::{TmdbMovieDetails, TmdbMovieSummary};
pub use watch_party::{
    JoinOutcome, NewWatchParty, PartyChatMessage, PartyStatus, PlaybackUpdate, WatchParty,
};

/// Primary key type shared by every table
pub type DbId = i64;

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// Resolved position of a page inside a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl PageWindow {
    /// Resolves a raw `page` query value leniently.
    ///
    /// A missing or non-integer value yields the first page. Any integer outside
    /// `1..=total_pages` (zero, negative, past the end or too large to parse)
    /// yields the last page. An empty listing still has one page.
    pub fn resolve(raw: Option<&str>, total: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page as u64).max(1) as u32;

        let page = match raw.map(|value| value.trim().parse::<i64>()) {
            None => 1,
            Some(Ok(n)) if (1..=total_pages as i64).contains(&n) => n as u32,
            Some(Ok(_)) => total_pages,
            Some(Err(e))
                if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) =>
            {
                total_pages
            }
            Some(Err(_)) => 1,
        };

        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}
