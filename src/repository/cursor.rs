//! Per-channel scan cursors.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime_opt, Result};
use crate::models::ScanCursorState;

/// SQLite-backed repository for scan cursors.
pub struct CursorRepository {
    db_path: PathBuf,
}

impl CursorRepository {
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS scan_cursors (
                channel_id INTEGER PRIMARY KEY,
                last_indexed_sequence INTEGER NOT NULL DEFAULT 0,
                target_sequence INTEGER,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Stored cursor, or a zero-value cursor if the channel was never scanned.
    pub fn get(&self, channel_id: i64) -> Result<ScanCursorState> {
        let conn = self.connect()?;
        let cursor = conn
            .query_row(
                r#"
                SELECT channel_id, last_indexed_sequence, target_sequence, updated_at
                FROM scan_cursors WHERE channel_id = ?1
                "#,
                params![channel_id],
                row_to_cursor,
            )
            .optional()?;
        Ok(cursor.unwrap_or_else(|| ScanCursorState::empty(channel_id)))
    }

    /// All stored cursors.
    pub fn list(&self) -> Result<Vec<ScanCursorState>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT channel_id, last_indexed_sequence, target_sequence, updated_at
            FROM scan_cursors ORDER BY channel_id
            "#,
        )?;
        let rows = stmt.query_map([], row_to_cursor)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Advance the cursor to `sequence` unless it is already at or past it.
    ///
    /// Returns the stored position after the call.
    pub fn checkpoint(&self, channel_id: i64, sequence: i64) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO scan_cursors (channel_id, last_indexed_sequence, updated_at)
            VALUES (?1, MAX(?2, 0), ?3)
            ON CONFLICT(channel_id) DO UPDATE SET
                last_indexed_sequence = MAX(last_indexed_sequence, excluded.last_indexed_sequence),
                updated_at = CASE
                    WHEN excluded.last_indexed_sequence > last_indexed_sequence
                    THEN excluded.updated_at
                    ELSE updated_at
                END
            "#,
            params![channel_id, sequence, Utc::now().to_rfc3339()],
        )?;
        let stored: i64 = conn.query_row(
            "SELECT last_indexed_sequence FROM scan_cursors WHERE channel_id = ?1",
            params![channel_id],
            |row| row.get(0),
        )?;
        Ok(stored)
    }

    /// Record the end of the range a scan was started with.
    pub fn set_target(&self, channel_id: i64, target: Option<i64>) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO scan_cursors (channel_id, last_indexed_sequence, target_sequence, updated_at)
            VALUES (?1, 0, ?2, ?3)
            ON CONFLICT(channel_id) DO UPDATE SET
                target_sequence = excluded.target_sequence,
                updated_at = excluded.updated_at
            "#,
            params![channel_id, target, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Forget the channel's position entirely.
    pub fn reset(&self, channel_id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let removed = conn.execute(
            "DELETE FROM scan_cursors WHERE channel_id = ?1",
            params![channel_id],
        )?;
        Ok(removed > 0)
    }
}

fn row_to_cursor(row: &rusqlite::Row) -> rusqlite::Result<ScanCursorState> {
    Ok(ScanCursorState {
        channel_id: row.get("channel_id")?,
        last_indexed_sequence: row.get("last_indexed_sequence")?,
        target_sequence: row.get("target_sequence")?,
        updated_at: parse_datetime_opt(row.get("updated_at")?),
    })
}
