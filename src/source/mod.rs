//! Message retrieval seam.
//!
//! The live platform client lives outside this crate; anything that can
//! hand back a message by channel and sequence number plugs in here.

mod export;

use async_trait::async_trait;

pub use export::JsonExportSource;

use crate::models::Message;

/// Result type for message fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors from a message source.
///
/// Missing and invalid sequences are kept apart from transient faults so
/// callers can tell them apart, even though the indexer budgets them the same.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Message {sequence} not found in channel {channel_id}")]
    NotFound { channel_id: i64, sequence: i64 },
    #[error("Invalid sequence {sequence} for channel {channel_id}")]
    InvalidSequence { channel_id: i64, sequence: i64 },
    #[error("Transient fetch failure: {0}")]
    Transient(String),
}

impl FetchError {
    /// Whether retrying the same sequence later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Source of channel messages addressed by sequence number.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn get_message(&self, channel_id: i64, sequence: i64) -> FetchResult<Message>;

    /// Highest sequence number currently in the channel.
    async fn get_latest_sequence(&self, channel_id: i64) -> FetchResult<i64>;
}
