//! Scan cursor and indexing session snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted scan position for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCursorState {
    pub channel_id: i64,
    /// Highest sequence fully processed. Zero means nothing has been processed.
    pub last_indexed_sequence: i64,
    /// End of the range the last scan was started with.
    pub target_sequence: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScanCursorState {
    /// Zero-value cursor for a channel with no stored state.
    pub fn empty(channel_id: i64) -> Self {
        Self {
            channel_id,
            last_indexed_sequence: 0,
            target_sequence: None,
            updated_at: None,
        }
    }

    /// First sequence a resumed scan should fetch.
    pub fn resume_from(&self) -> i64 {
        self.last_indexed_sequence.max(0).saturating_add(1)
    }
}

/// Lifecycle phase of the indexing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Scanning,
    Completed,
    Stopped,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Scanning => 1,
            Self::Completed => 2,
            Self::Stopped => 3,
            Self::Failed => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Scanning,
            2 => Self::Completed,
            3 => Self::Stopped,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the indexing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingSession {
    pub active: bool,
    pub phase: SessionPhase,
    pub channel_id: Option<i64>,
    /// Sequence currently being processed (or last processed once finished).
    pub cursor_position: i64,
    pub start_sequence: i64,
    pub end_sequence: i64,
    pub scanned_count: u64,
    pub matched_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
    pub duplicate_count: u64,
    pub stop_requested: bool,
}

impl IndexingSession {
    /// Sequences left before the end of the range.
    pub fn remaining(&self) -> u64 {
        span(self.cursor_position, self.end_sequence)
    }

    /// Total sequences in the range.
    pub fn range_len(&self) -> u64 {
        span(self.start_sequence, self.end_sequence).saturating_add(1)
    }
}

/// `to - from`, zero when negative.
fn span(from: i64, to: i64) -> u64 {
    let diff = i128::from(to) - i128::from(from);
    u64::try_from(diff.max(0)).unwrap_or(u64::MAX)
}
