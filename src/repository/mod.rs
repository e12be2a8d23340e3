//! Repository layer for database persistence.
//!
//! All database access goes through Diesel with diesel-async's
//! SyncConnectionWrapper providing an async interface over SQLite. The
//! `Database` handle in `context` opens pragma-configured connections per
//! operation.

mod comic;
mod context;
mod favorite;
mod user;

pub use comic::ComicRepository;
pub use context::{Database, DbContext};
pub use favorite::FavoriteRepository;
pub use user::UserRepository;

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
