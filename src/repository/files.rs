//! Indexed file records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Result};
use crate::models::{FileRecord, FileType, Platform};

const FILE_COLUMNS: &str = "file_id, file_unique_id, backup_file_id, file_name, caption, \
     file_type, mime_type, file_size, duration, width, height, chat_id, chat_title, message_id, \
     sender_id, sender_username, date, track_url, track_id, platform, is_deleted, indexed_at";

/// Aggregate counts over the files table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub total_files: u64,
    pub deleted_files: u64,
    pub total_bytes: u64,
    pub with_track: u64,
    pub backed_up: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_platform: BTreeMap<String, u64>,
}

/// SQLite-backed repository for file records.
pub struct FileRepository {
    db_path: PathBuf,
}

impl FileRepository {
    /// Create a new file repository, creating its schema if needed.
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
            CREATE TABLE IF NOT EXISTS files (
                file_id TEXT PRIMARY KEY,
                file_unique_id TEXT NOT NULL,
                backup_file_id TEXT,

                file_name TEXT NOT NULL,
                caption TEXT,
                file_type TEXT NOT NULL,
                mime_type TEXT,
                file_size INTEGER,
                duration INTEGER,
                width INTEGER,
                height INTEGER,

                -- Origin
                chat_id INTEGER NOT NULL,
                chat_title TEXT,
                message_id INTEGER NOT NULL,
                sender_id INTEGER,
                sender_username TEXT,
                date TEXT NOT NULL,

                -- Track identity
                track_url TEXT,
                track_id TEXT,
                platform TEXT,

                is_deleted INTEGER NOT NULL DEFAULT 0,
                indexed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_files_unique_id ON files(file_unique_id);
            CREATE INDEX IF NOT EXISTS idx_files_backup_id ON files(backup_file_id);
            CREATE INDEX IF NOT EXISTS idx_files_track_id ON files(track_id);
            CREATE INDEX IF NOT EXISTS idx_files_chat ON files(chat_id, message_id);
            CREATE INDEX IF NOT EXISTS idx_files_name ON files(file_name COLLATE NOCASE);
        "#,
        )?;
        Ok(())
    }

    /// Insert a record, or overwrite the existing one with the same `file_id`.
    pub fn upsert(&self, record: &FileRecord) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO files (
                file_id, file_unique_id, backup_file_id, file_name, caption,
                file_type, mime_type, file_size, duration, width, height,
                chat_id, chat_title, message_id, sender_id, sender_username, date,
                track_url, track_id, platform, is_deleted, indexed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                      ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
            ON CONFLICT(file_id) DO UPDATE SET
                file_unique_id = excluded.file_unique_id,
                backup_file_id = excluded.backup_file_id,
                file_name = excluded.file_name,
                caption = excluded.caption,
                file_type = excluded.file_type,
                mime_type = excluded.mime_type,
                file_size = excluded.file_size,
                duration = excluded.duration,
                width = excluded.width,
                height = excluded.height,
                chat_id = excluded.chat_id,
                chat_title = excluded.chat_title,
                message_id = excluded.message_id,
                sender_id = excluded.sender_id,
                sender_username = excluded.sender_username,
                date = excluded.date,
                track_url = excluded.track_url,
                track_id = excluded.track_id,
                platform = excluded.platform,
                is_deleted = excluded.is_deleted,
                indexed_at = excluded.indexed_at
            "#,
            params![
                record.file_id,
                record.file_unique_id,
                record.backup_file_id,
                record.file_name,
                record.caption,
                record.file_type.as_str(),
                record.mime_type,
                record.file_size.map(|s| s as i64),
                record.duration,
                record.width,
                record.height,
                record.chat_id,
                record.chat_title,
                record.message_id,
                record.sender_id,
                record.sender_username,
                record.date.to_rfc3339(),
                record.track_url,
                record.track_id,
                record.platform.map(|p| p.as_str()),
                record.is_deleted as i32,
                record.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a record by its primary file id.
    pub fn get_by_file_id(&self, file_id: &str) -> Result<Option<FileRecord>> {
        self.query_one("file_id = ?1", file_id)
    }

    /// Get a record by its content-stable unique id.
    pub fn get_by_unique_id(&self, file_unique_id: &str) -> Result<Option<FileRecord>> {
        self.query_one("file_unique_id = ?1", file_unique_id)
    }

    /// Get a record by the id of its mirrored copy.
    pub fn get_by_backup_id(&self, backup_file_id: &str) -> Result<Option<FileRecord>> {
        self.query_one("backup_file_id = ?1", backup_file_id)
    }

    fn query_one(&self, predicate: &str, value: &str) -> Result<Option<FileRecord>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM files WHERE {} ORDER BY indexed_at LIMIT 1",
            FILE_COLUMNS, predicate
        );
        let record = conn
            .query_row(&sql, params![value], row_to_file_record)
            .optional()?;
        Ok(record)
    }

    /// Non-deleted records carrying the given track id.
    pub fn find_by_track_id(&self, track_id: &str) -> Result<Vec<FileRecord>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM files WHERE track_id = ?1 AND is_deleted = 0 ORDER BY date DESC",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![track_id], row_to_file_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Search non-deleted records by file name.
    ///
    /// Case-insensitive exact matches are returned if any exist; otherwise
    /// substring matches.
    pub fn find_by_name(&self, name: &str, limit: usize) -> Result<Vec<FileRecord>> {
        let conn = self.connect()?;

        let exact_sql = format!(
            "SELECT {} FROM files WHERE file_name = ?1 COLLATE NOCASE AND is_deleted = 0 \
             ORDER BY date DESC LIMIT ?2",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&exact_sql)?;
        let exact = stmt
            .query_map(params![name, limit as i64], row_to_file_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if !exact.is_empty() {
            return Ok(exact);
        }

        let like_sql = format!(
            "SELECT {} FROM files WHERE file_name LIKE ?1 ESCAPE '\\' AND is_deleted = 0 \
             ORDER BY date DESC LIMIT ?2",
            FILE_COLUMNS
        );
        let pattern = format!("%{}%", escape_like(name));
        let mut stmt = conn.prepare(&like_sql)?;
        let partial = stmt
            .query_map(params![pattern, limit as i64], row_to_file_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(partial)
    }

    /// Records from one chat, newest message first.
    pub fn list_by_chat(&self, chat_id: i64, limit: usize) -> Result<Vec<FileRecord>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM files WHERE chat_id = ?1 AND is_deleted = 0 \
             ORDER BY message_id DESC LIMIT ?2",
            FILE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![chat_id, limit as i64], row_to_file_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Soft-delete a record. Returns whether a record was changed.
    pub fn mark_deleted(&self, file_id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE files SET is_deleted = 1 WHERE file_id = ?1 AND is_deleted = 0",
            params![file_id],
        )?;
        Ok(changed > 0)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Aggregate statistics over non-deleted records.
    pub fn statistics(&self) -> Result<FileStats> {
        let conn = self.connect()?;

        let (total, bytes, with_track, backed_up): (i64, i64, i64, i64) = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(file_size), 0),
                COUNT(track_id),
                COUNT(backup_file_id)
            FROM files WHERE is_deleted = 0
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        let deleted: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE is_deleted = 1",
            [],
            |row| row.get(0),
        )?;

        let mut stats = FileStats {
            total_files: total as u64,
            deleted_files: deleted as u64,
            total_bytes: bytes as u64,
            with_track: with_track as u64,
            backed_up: backed_up as u64,
            ..Default::default()
        };

        {
            let mut stmt = conn.prepare(
                "SELECT file_type, COUNT(*) FROM files WHERE is_deleted = 0 GROUP BY file_type",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?;
            for row in rows {
                let (file_type, count) = row?;
                stats.by_type.insert(file_type, count);
            }
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT platform, COUNT(*) FROM files
            WHERE is_deleted = 0 AND platform IS NOT NULL
            GROUP BY platform
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        for row in rows {
            let (platform, count) = row?;
            stats.by_platform.insert(platform, count);
        }

        Ok(stats)
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Parse a database row into a FileRecord.
fn row_to_file_record(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        file_id: row.get("file_id")?,
        file_unique_id: row.get("file_unique_id")?,
        backup_file_id: row.get("backup_file_id")?,
        file_name: row.get("file_name")?,
        caption: row.get("caption")?,
        file_type: FileType::from_str(&row.get::<_, String>("file_type")?)
            .unwrap_or(FileType::Document),
        mime_type: row.get("mime_type")?,
        file_size: row.get::<_, Option<i64>>("file_size")?.map(|s| s as u64),
        duration: row.get("duration")?,
        width: row.get("width")?,
        height: row.get("height")?,
        chat_id: row.get("chat_id")?,
        chat_title: row.get("chat_title")?,
        message_id: row.get("message_id")?,
        sender_id: row.get("sender_id")?,
        sender_username: row.get("sender_username")?,
        date: parse_datetime(&row.get::<_, String>("date")?),
        track_url: row.get("track_url")?,
        track_id: row.get("track_id")?,
        platform: row
            .get::<_, Option<String>>("platform")?
            .and_then(|p| Platform::from_str(&p)),
        is_deleted: row.get::<_, i32>("is_deleted")? != 0,
        indexed_at: parse_datetime(&row.get::<_, String>("indexed_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn repo() -> (TempDir, FileRepository) {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::new(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    fn record(file_id: &str, name: &str) -> FileRecord {
        FileRecord {
            file_id: file_id.to_string(),
            file_unique_id: format!("u-{}", file_id),
            backup_file_id: None,
            file_name: name.to_string(),
            caption: None,
            file_type: FileType::Audio,
            mime_type: Some("audio/mpeg".to_string()),
            file_size: Some(2_097_152),
            duration: Some(185),
            width: None,
            height: None,
            chat_id: -1001,
            chat_title: Some("Drops".to_string()),
            message_id: 10,
            sender_id: None,
            sender_username: None,
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            track_url: None,
            track_id: None,
            platform: None,
            is_deleted: false,
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_same_key_twice_keeps_one_record() {
        let (_dir, repo) = repo();
        let mut rec = record("F1", "song.mp3");
        repo.upsert(&rec).unwrap();
        rec.track_id = Some("abc".to_string());
        repo.upsert(&rec).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        let stored = repo.get_by_file_id("F1").unwrap().unwrap();
        assert_eq!(stored.track_id.as_deref(), Some("abc"));
        assert_eq!(stored.date, rec.date);
    }

    #[test]
    fn test_lookup_by_secondary_ids() {
        let (_dir, repo) = repo();
        let mut rec = record("F1", "song.mp3");
        rec.backup_file_id = Some("B1".to_string());
        repo.upsert(&rec).unwrap();

        assert_eq!(
            repo.get_by_unique_id("u-F1").unwrap().map(|r| r.file_id),
            Some("F1".to_string())
        );
        assert_eq!(
            repo.get_by_backup_id("B1").unwrap().map(|r| r.file_id),
            Some("F1".to_string())
        );
        assert!(repo.get_by_file_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_find_by_name_prefers_exact() {
        let (_dir, repo) = repo();
        repo.upsert(&record("F1", "Song.mp3")).unwrap();
        repo.upsert(&record("F2", "Another Song.mp3")).unwrap();

        let exact = repo.find_by_name("song.MP3", 10).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].file_id, "F1");

        let partial = repo.find_by_name("song", 10).unwrap();
        assert_eq!(partial.len(), 2);
    }

    #[test]
    fn test_find_by_name_escapes_wildcards() {
        let (_dir, repo) = repo();
        repo.upsert(&record("F1", "100% hits.mp3")).unwrap();
        repo.upsert(&record("F2", "1000 hits.mp3")).unwrap();
        let found = repo.find_by_name("0%", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_id, "F1");
    }

    #[test]
    fn test_deleted_records_hidden_from_search() {
        let (_dir, repo) = repo();
        let mut rec = record("F1", "song.mp3");
        rec.track_id = Some("abc".to_string());
        repo.upsert(&rec).unwrap();

        assert!(repo.mark_deleted("F1").unwrap());
        assert!(!repo.mark_deleted("F1").unwrap());
        assert!(repo.find_by_track_id("abc").unwrap().is_empty());
        assert!(repo.find_by_name("song", 10).unwrap().is_empty());
        assert!(repo.get_by_file_id("F1").unwrap().unwrap().is_deleted);
    }

    #[test]
    fn test_statistics() {
        let (_dir, repo) = repo();
        let mut tracked = record("F1", "a.mp3");
        tracked.track_id = Some("x".to_string());
        tracked.platform = Some(Platform::Spotify);
        tracked.backup_file_id = Some("B1".to_string());
        repo.upsert(&tracked).unwrap();

        let mut video = record("F2", "b.mp4");
        video.file_type = FileType::Video;
        video.file_size = None;
        repo.upsert(&video).unwrap();

        let stats = repo.statistics().unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_bytes, 2_097_152);
        assert_eq!(stats.with_track, 1);
        assert_eq!(stats.backed_up, 1);
        assert_eq!(stats.by_type.get("video"), Some(&1));
        assert_eq!(stats.by_platform.get("spotify"), Some(&1));
    }

    #[test]
    fn test_list_by_chat_newest_first() {
        let (_dir, repo) = repo();
        let mut first = record("F1", "a.mp3");
        first.message_id = 1;
        let mut second = record("F2", "b.mp3");
        second.message_id = 2;
        repo.upsert(&first).unwrap();
        repo.upsert(&second).unwrap();

        let listed = repo.list_by_chat(-1001, 10).unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.file_id.as_str()).collect();
        assert_eq!(ids, vec!["F2", "F1"]);
        assert!(repo.list_by_chat(42, 10).unwrap().is_empty());
    }
}
