//! Async document store seam used by the indexer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::{CursorRepository, FileRepository, RepositoryError, Result};
use crate::models::{FileRecord, ScanCursorState};

/// Storage the indexing loop persists into.
///
/// Writes are keyed upserts, so replays after a crash or a re-scan never
/// create a second logical record. Implementations must tolerate concurrent
/// readers while a scan is writing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or overwrite a record keyed by `file_id`.
    async fn upsert_by_key(&self, record: &FileRecord) -> Result<()>;

    /// Look up a record by `file_id`.
    async fn find_by_key(&self, file_id: &str) -> Result<Option<FileRecord>>;

    /// Look up a record by `file_unique_id`.
    async fn find_by_unique_id(&self, file_unique_id: &str) -> Result<Option<FileRecord>>;

    async fn get_cursor(&self, channel_id: i64) -> Result<ScanCursorState>;

    /// Advance the stored cursor; lower values leave it unchanged.
    async fn set_cursor(&self, channel_id: i64, sequence: i64) -> Result<()>;

    async fn set_target(&self, channel_id: i64, target: Option<i64>) -> Result<()>;

    async fn reset_cursor(&self, channel_id: i64) -> Result<()>;
}

/// [`DocumentStore`] over the SQLite repositories.
///
/// Each call runs on the blocking pool so the scan task never stalls the runtime.
#[derive(Clone)]
pub struct SqliteStore {
    files: Arc<FileRepository>,
    cursors: Arc<CursorRepository>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            files: Arc::new(FileRepository::new(db_path)?),
            cursors: Arc::new(CursorRepository::new(db_path)?),
        })
    }

    pub fn files(&self) -> &FileRepository {
        &self.files
    }

    pub fn cursors(&self) -> &CursorRepository {
        &self.cursors
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RepositoryError::Task(e.to_string()))?
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert_by_key(&self, record: &FileRecord) -> Result<()> {
        let files = self.files.clone();
        let record = record.clone();
        blocking(move || files.upsert(&record)).await
    }

    async fn find_by_key(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let files = self.files.clone();
        let file_id = file_id.to_string();
        blocking(move || files.get_by_file_id(&file_id)).await
    }

    async fn find_by_unique_id(&self, file_unique_id: &str) -> Result<Option<FileRecord>> {
        let files = self.files.clone();
        let unique_id = file_unique_id.to_string();
        blocking(move || files.get_by_unique_id(&unique_id)).await
    }

    async fn get_cursor(&self, channel_id: i64) -> Result<ScanCursorState> {
        let cursors = self.cursors.clone();
        blocking(move || cursors.get(channel_id)).await
    }

    async fn set_cursor(&self, channel_id: i64, sequence: i64) -> Result<()> {
        let cursors = self.cursors.clone();
        blocking(move || cursors.checkpoint(channel_id, sequence).map(|_| ())).await
    }

    async fn set_target(&self, channel_id: i64, target: Option<i64>) -> Result<()> {
        let cursors = self.cursors.clone();
        blocking(move || cursors.set_target(channel_id, target)).await
    }

    async fn reset_cursor(&self, channel_id: i64) -> Result<()> {
        let cursors = self.cursors.clone();
        blocking(move || cursors.reset(channel_id).map(|_| ())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_cursor_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("store.db")).unwrap();

        store.set_cursor(7, 12).await.unwrap();
        store.set_cursor(7, 3).await.unwrap();
        assert_eq!(store.get_cursor(7).await.unwrap().last_indexed_sequence, 12);

        store.reset_cursor(7).await.unwrap();
        assert_eq!(store.get_cursor(7).await.unwrap().last_indexed_sequence, 0);
    }
}
