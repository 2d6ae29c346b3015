pub mod accounts;
pub mod catalog;
pub mod engagement;
pub mod lists;
pub mod messaging;
pub mod notifications;
pub mod providers;
pub mod recommendations;
pub mod social;
pub mod tmdb_import;
pub mod watch_parties;

use crate::error::{AppError, AppResult};

pub use providers::{MovieCatalogProvider, TmdbProvider};

/// Trims `value` and rejects it when blank or longer than `max` characters
pub(crate) fn required_text(field: &str, value: &str, max: Option<usize>) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "{} is required",
            field
        )));
    }
    if let Some(max) = max {
        if trimmed.chars().count() > max {
            return Err(AppError::InvalidInput(format!(
                "{} cannot exceed {} characters",
                field, max
            )));
        }
    }
    Ok(trimmed.to_string())
}
