//! Database access: connection setup plus repository handles.
//!
//! Create one `DbContext` per command or service, then use it to obtain the
//! repositories.

use std::path::Path;
use std::sync::Arc;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::comic::ComicRepository;
use super::favorite::FavoriteRepository;
use super::user::UserRepository;
use crate::error::{Error, Result};

/// Async SQLite connection; diesel-async's wrapper runs the blocking work on
/// the runtime's blocking pool.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Statements applied to every fresh connection. Ingest runs up to 64
/// concurrent writers against one database file; WAL plus a busy timeout
/// keeps their upserts from failing with SQLITE_BUSY, and favorites rely on
/// the users foreign key being enforced.
const CONNECTION_PRAGMAS: &str = "\
    PRAGMA journal_mode = WAL; \
    PRAGMA busy_timeout = 5000; \
    PRAGMA foreign_keys = ON;";

/// Shared handle to the database file.
///
/// SQLite connections are cheap to open, so each repository operation gets a
/// fresh, pragma-configured connection instead of holding a pool.
#[derive(Clone)]
pub struct Database {
    path: Arc<str>,
}

impl Database {
    /// Accepts a `sqlite:` URL or a bare filesystem path.
    fn new(database_url: &str) -> Self {
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            path: Arc::from(path),
        }
    }

    /// Open a connection with the per-connection pragmas applied.
    pub(crate) async fn connect(&self) -> Result<SqliteConn> {
        let mut conn = SqliteConn::establish(&self.path)
            .await
            .map_err(|e| Error::Unavailable(format!("open database {}: {e}", self.path)))?;
        conn.batch_execute(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }
}

#[derive(Clone)]
pub struct DbContext {
    db: Database,
}

impl DbContext {
    /// Create a context from a file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            db: Database::new(&db_path.display().to_string()),
        }
    }

    /// Create a context from a database URL (`sqlite:path` or a bare path).
    pub fn from_url(database_url: &str) -> Self {
        Self {
            db: Database::new(database_url),
        }
    }

    pub fn comics(&self) -> ComicRepository {
        ComicRepository::new(self.db.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    pub fn favorites(&self) -> FavoriteRepository {
        FavoriteRepository::new(self.db.clone())
    }

    /// Verify the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.db.connect().await?;
        conn.batch_execute("SELECT 1").await?;
        Ok(())
    }

    /// Initialize all tables. Idempotent.
    pub async fn init_schema(&self) -> Result<()> {
        let mut conn = self.db.connect().await?;

        conn.batch_execute(
            r#"
            -- Comic documents. id is the upstream catalog number; the three
            -- token columns hold JSON-encoded string arrays.
            CREATE TABLE IF NOT EXISTS comics (
                id INTEGER PRIMARY KEY,
                img_url TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '[]',
                alt TEXT NOT NULL DEFAULT '[]',
                words TEXT NOT NULL DEFAULT '[]',
                fetched_at TEXT NOT NULL
            );

            -- Accounts: web registrations carry email+password_hash,
            -- telegram logins carry tg_id.
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE,
                password_hash TEXT,
                tg_id INTEGER UNIQUE,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                created_at TEXT NOT NULL
            );

            -- Per-user comic bookmarks.
            CREATE TABLE IF NOT EXISTS favorites (
                user_id INTEGER NOT NULL,
                comic_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, comic_id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_favorites_user
                ON favorites(user_id, created_at);
            "#,
        )
        .await?;

        Ok(())
    }
}
