//! Resumable scan position.

use std::sync::Arc;

use tracing::debug;

use crate::models::ScanCursorState;
use crate::repository::{DocumentStore, Result};

/// Per-channel scan cursor over a [`DocumentStore`].
///
/// Checkpoints only move forward; the position drops only on [`ScanCursor::reset`].
#[derive(Clone)]
pub struct ScanCursor {
    store: Arc<dyn DocumentStore>,
}

impl ScanCursor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stored state, or a zero-value cursor for a channel never scanned.
    pub async fn load(&self, channel_id: i64) -> Result<ScanCursorState> {
        self.store.get_cursor(channel_id).await
    }

    /// Advance to `sequence`. Returns `false` when it would not move forward.
    pub async fn checkpoint(&self, channel_id: i64, sequence: i64) -> Result<bool> {
        let current = self.store.get_cursor(channel_id).await?;
        if sequence <= current.last_indexed_sequence {
            debug!(
                "Checkpoint {} for channel {} not ahead of {}",
                sequence, channel_id, current.last_indexed_sequence
            );
            return Ok(false);
        }
        self.store.set_cursor(channel_id, sequence).await?;
        debug!("Checkpointed channel {} at {}", channel_id, sequence);
        Ok(true)
    }

    pub async fn set_target(&self, channel_id: i64, target: Option<i64>) -> Result<()> {
        self.store.set_target(channel_id, target).await
    }

    pub async fn reset(&self, channel_id: i64) -> Result<()> {
        self.store.reset_cursor(channel_id).await
    }
}
