//! Mirroring indexed media to a backup channel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::FileType;

/// Result type for backup sends.
pub type SendResult<T> = Result<T, SendError>;

/// Errors from a backup sink.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error("Rate limited by backup destination, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("Backup send failed: {0}")]
    Failed(String),
}

/// Media to forward, identified by where it was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub chat_id: i64,
    pub message_id: i64,
    pub file_id: String,
    pub file_type: FileType,
}

/// Destination that accepts copies of indexed media.
#[async_trait]
pub trait BackupSink: Send + Sync {
    /// Send `media` to `destination` and return the delivered file reference.
    async fn send_media(&self, destination: i64, media: &MediaRef, caption: &str)
        -> SendResult<String>;
}

/// Outcome of a mirror attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub reference: String,
    /// Whether the first attempt was rate limited.
    pub retried: bool,
}

/// Send once; on a rate-limit signal wait the requested time and try exactly once more.
pub async fn mirror_with_retry(
    sink: &dyn BackupSink,
    destination: i64,
    media: &MediaRef,
    caption: &str,
) -> SendResult<Delivery> {
    match sink.send_media(destination, media, caption).await {
        Ok(reference) => Ok(Delivery {
            reference,
            retried: false,
        }),
        Err(SendError::RateLimited { retry_after }) => {
            warn!(
                "Backup of {} rate limited, waiting {:?} before retrying",
                media.file_id, retry_after
            );
            tokio::time::sleep(retry_after).await;
            let reference = sink.send_media(destination, media, caption).await?;
            Ok(Delivery {
                reference,
                retried: true,
            })
        }
        Err(e) => Err(e),
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    reference: &'a str,
    destination: i64,
    #[serde(flatten)]
    media: &'a MediaRef,
    caption: &'a str,
    sent_at: String,
}

/// Backup sink that appends deliveries to a JSON-lines outbox file.
///
/// A separate uploader drains the outbox into the real destination.
pub struct OutboxBackupSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OutboxBackupSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deterministic reference for a media item at a destination.
    fn reference_for(destination: i64, media: &MediaRef) -> String {
        let mut hasher = Sha256::new();
        hasher.update(destination.to_le_bytes());
        hasher.update(media.file_id.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("outbox:{}", &digest[..16])
    }
}

#[async_trait]
impl BackupSink for OutboxBackupSink {
    async fn send_media(
        &self,
        destination: i64,
        media: &MediaRef,
        caption: &str,
    ) -> SendResult<String> {
        let reference = Self::reference_for(destination, media);
        let entry = OutboxEntry {
            reference: &reference,
            destination,
            media,
            caption,
            sent_at: Utc::now().to_rfc3339(),
        };
        let mut line =
            serde_json::to_string(&entry).map_err(|e| SendError::Failed(e.to_string()))?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SendError::Failed(e.to_string()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SendError::Failed(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SendError::Failed(e.to_string()))?;

        debug!("Queued {} for backup as {}", media.file_id, reference);
        Ok(reference)
    }
}
