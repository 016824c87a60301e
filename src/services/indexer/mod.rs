//! Resumable channel indexing.
//!
//! [`Indexer`] owns the single scanning worker of a deployment. A scan walks
//! a channel's sequence numbers in ascending order, extracts track links from
//! media messages, persists file records, mirrors media to a backup channel,
//! and checkpoints its position so a later scan can resume.
//!
//! Only one session runs at a time; [`Indexer::start_scan`] rejects a second
//! one while the first is active. Stops are cooperative: the loop finishes the
//! item in flight, checkpoints it, and exits.

mod cursor;
mod progress;
mod runner;
mod session;
mod throttle;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use cursor::ScanCursor;
pub use progress::{BarProgress, NullProgress, ProgressSink, TracingProgress};
pub use throttle::{Throttle, ThrottleConfig};

use crate::extract::{CandidateCollector, ReconstructionHeuristic};
use crate::models::{IndexingSession, SessionPhase};
use crate::repository::{DocumentStore, RepositoryError};
use crate::services::backup::BackupSink;
use crate::source::MessageSource;
use runner::ScanWorker;
use session::SessionState;

/// Errors surfaced by the indexer API.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("An indexing session is already active for channel {0}")]
    AlreadyActive(i64),
    #[error("Storage error: {0}")]
    Store(#[from] RepositoryError),
    #[error("Scan task failed: {0}")]
    Task(String),
}

/// Tuning for the scan loop.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Delay applied after each media item.
    pub item_delay: Duration,
    /// Consecutive fetch failures that abort a session.
    pub max_failures: u32,
    /// Checkpoint after this many fetched messages.
    pub checkpoint_every: u64,
    /// Checkpoint at least this often.
    pub checkpoint_interval: Duration,
    /// Channel to mirror media into; `None` disables mirroring.
    pub backup_destination: Option<i64>,
    pub include_track_id_in_caption: bool,
    pub heuristics: Vec<ReconstructionHeuristic>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(3),
            max_failures: 25,
            checkpoint_every: 50,
            checkpoint_interval: Duration::from_secs(30),
            backup_destination: None,
            include_track_id_in_caption: true,
            heuristics: ReconstructionHeuristic::ALL.to_vec(),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Stopped,
    Failed { reason: String },
}

impl ScanOutcome {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Completed => SessionPhase::Completed,
            Self::Stopped => SessionPhase::Stopped,
            Self::Failed { .. } => SessionPhase::Failed,
        }
    }
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Stopped => f.write_str("stopped"),
            Self::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

/// Final state of a session.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    /// Stored cursor after the session; unchanged when nothing was processed.
    pub last_processed: i64,
    pub session: IndexingSession,
}

/// Handle to a running scan.
pub struct ScanHandle {
    channel_id: i64,
    join: JoinHandle<ScanReport>,
}

impl ScanHandle {
    pub fn channel_id(&self) -> i64 {
        self.channel_id
    }

    /// Wait for the session to reach a terminal phase.
    pub async fn wait(self) -> Result<ScanReport, IndexerError> {
        self.join
            .await
            .map_err(|e| IndexerError::Task(e.to_string()))
    }
}

/// Drives scans over a message source into a document store.
pub struct Indexer {
    source: Arc<dyn MessageSource>,
    store: Arc<dyn DocumentStore>,
    backup: Option<Arc<dyn BackupSink>>,
    progress: Arc<dyn ProgressSink>,
    config: IndexerConfig,
    state: Arc<SessionState>,
}

impl Indexer {
    pub fn new(
        source: Arc<dyn MessageSource>,
        store: Arc<dyn DocumentStore>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            source,
            store,
            backup: None,
            progress: Arc::new(TracingProgress),
            config,
            state: Arc::new(SessionState::default()),
        }
    }

    pub fn with_backup(mut self, sink: Arc<dyn BackupSink>) -> Self {
        self.backup = Some(sink);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Cursor over this indexer's store.
    pub fn cursor(&self) -> ScanCursor {
        ScanCursor::new(self.store.clone())
    }

    /// Start scanning `channel_id` on a background task.
    ///
    /// `start_seq` defaults to one past the stored cursor; `end_seq` defaults
    /// to the channel's latest sequence. Must be called from within a Tokio
    /// runtime.
    pub fn start_scan(
        &self,
        channel_id: i64,
        start_seq: Option<i64>,
        end_seq: Option<i64>,
    ) -> Result<ScanHandle, IndexerError> {
        if !self.state.try_begin(channel_id) {
            let active = self.state.snapshot().channel_id.unwrap_or(channel_id);
            warn!(
                "Rejected scan of channel {}: channel {} is already being scanned",
                channel_id, active
            );
            return Err(IndexerError::AlreadyActive(active));
        }

        let backup = match (&self.backup, self.config.backup_destination) {
            (Some(sink), Some(destination)) => Some((sink.clone(), destination)),
            (Some(_), None) => {
                warn!("Backup sink configured without a destination, mirroring disabled");
                None
            }
            _ => None,
        };

        let worker = ScanWorker {
            channel_id,
            source: self.source.clone(),
            cursor: self.cursor(),
            store: self.store.clone(),
            backup,
            progress: self.progress.clone(),
            collector: CandidateCollector::new(self.config.heuristics.clone()),
            throttle: Throttle::new(ThrottleConfig::with_base_delay(self.config.item_delay)),
            config: self.config.clone(),
            state: self.state.clone(),
        };

        info!("Starting scan of channel {}", channel_id);
        let join = tokio::spawn(worker.run(start_seq, end_seq));
        Ok(ScanHandle { channel_id, join })
    }

    /// Ask the running session to stop after its current item.
    ///
    /// Returns `false` if nothing was running.
    pub fn request_stop(&self) -> bool {
        let requested = self.state.request_stop();
        if requested {
            info!("Stop requested for running scan");
        }
        requested
    }

    pub fn current_session_state(&self) -> IndexingSession {
        self.state.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}
