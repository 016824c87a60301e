//! Repository layer for SQLite persistence.
//!
//! Repositories are synchronous and open a short-lived connection per call.
//! [`SqliteStore`] wraps them behind the async [`DocumentStore`] seam used by
//! the indexer.

mod cursor;
mod files;
mod store;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub use cursor::CursorRepository;
pub use files::{FileRepository, FileStats};
pub use store::{DocumentStore, SqliteStore};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Open a connection with the concurrency settings every repository relies on.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
    "#,
    )?;
    Ok(conn)
}

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

/// Create every table used by trackdex.
pub fn init_database(db_path: &Path) -> Result<()> {
    FileRepository::new(db_path)?;
    CursorRepository::new(db_path)?;
    Ok(())
}
