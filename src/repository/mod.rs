//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over an async SQLite connection.

pub mod diesel_job;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod util;

pub use diesel_job::{DieselJobRepository, InsertOutcome, JobFilter, StatusUpdate};
pub use pool::{DbError, SqlitePool};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
