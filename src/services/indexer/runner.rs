//! The scan loop of one session.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::cursor::ScanCursor;
use super::progress::ProgressSink;
use super::session::{Counter, SessionState};
use super::throttle::Throttle;
use super::{IndexerConfig, ScanOutcome, ScanReport};
use crate::extract::{extract_track, CandidateCollector};
use crate::models::{FileMetadata, FileRecord, MediaSource, Message, SessionPhase};
use crate::repository::{DocumentStore, RepositoryError};
use crate::services::backup::{mirror_with_retry, BackupSink, MediaRef, SendError};
use crate::services::caption::format_caption;
use crate::source::MessageSource;

/// Per-item failure; counted, never fatal.
#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error("message has no indexable media")]
    NoMedia,
    #[error(transparent)]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Backup(#[from] SendError),
}

/// Bounds of one session plus the cursor stored when it began.
struct ScanRange {
    start: i64,
    end: i64,
    stored: i64,
}

/// What happened to one media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Indexed { matched: bool, rate_limited: bool },
    Duplicate { matched: bool },
}

/// Releases the session if the scan task unwinds before finishing normally.
struct SessionGuard {
    state: Arc<SessionState>,
    armed: bool,
}

impl SessionGuard {
    fn complete(mut self, phase: SessionPhase) {
        self.armed = false;
        self.state.finish(phase);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.armed {
            error!("Scan task ended abnormally, releasing session");
            self.state.finish(SessionPhase::Failed);
        }
    }
}

pub(super) struct ScanWorker {
    pub channel_id: i64,
    pub source: Arc<dyn MessageSource>,
    pub store: Arc<dyn DocumentStore>,
    pub cursor: ScanCursor,
    pub backup: Option<(Arc<dyn BackupSink>, i64)>,
    pub progress: Arc<dyn ProgressSink>,
    pub collector: CandidateCollector,
    pub throttle: Throttle,
    pub config: IndexerConfig,
    pub state: Arc<SessionState>,
}

impl ScanWorker {
    pub async fn run(mut self, start_seq: Option<i64>, end_seq: Option<i64>) -> ScanReport {
        let guard = SessionGuard {
            state: self.state.clone(),
            armed: true,
        };

        let (outcome, last_processed) = match self.resolve_range(start_seq, end_seq).await {
            Ok(range) => {
                let (outcome, last_done) = self.scan(range.start, range.end).await;
                (outcome, last_done.map_or(range.stored, |d| d.max(range.stored)))
            }
            Err(reason) => (ScanOutcome::Failed { reason }, 0),
        };

        match &outcome {
            ScanOutcome::Completed => info!(
                "Scan of channel {} completed at {}",
                self.channel_id, last_processed
            ),
            ScanOutcome::Stopped => info!(
                "Scan of channel {} stopped at {}",
                self.channel_id, last_processed
            ),
            ScanOutcome::Failed { reason } => error!(
                "Scan of channel {} failed after {}: {}",
                self.channel_id, last_processed, reason
            ),
        }

        guard.complete(outcome.phase());
        let report = ScanReport {
            outcome,
            last_processed,
            session: self.state.snapshot(),
        };
        self.progress.finish(&report);
        report
    }

    async fn resolve_range(
        &self,
        start_seq: Option<i64>,
        end_seq: Option<i64>,
    ) -> Result<ScanRange, String> {
        let stored = self
            .cursor
            .load(self.channel_id)
            .await
            .map_err(|e| format!("could not load cursor: {}", e))?;
        let start = start_seq.unwrap_or_else(|| stored.resume_from());
        let end = match end_seq {
            Some(end) => end,
            None => self
                .source
                .get_latest_sequence(self.channel_id)
                .await
                .map_err(|e| format!("could not read latest sequence: {}", e))?,
        };
        let start = start.max(1);

        self.cursor
            .set_target(self.channel_id, Some(end))
            .await
            .map_err(|e| format!("could not record scan target: {}", e))?;
        self.state.set_range(start, end);
        info!(
            "Scanning channel {} from {} to {}",
            self.channel_id, start, end
        );
        Ok(ScanRange {
            start,
            end,
            stored: stored.last_indexed_sequence,
        })
    }

    /// Walk `start..=end`. Returns the outcome and the last fully processed
    /// sequence, `None` when nothing was processed.
    async fn scan(&mut self, start: i64, end: i64) -> (ScanOutcome, Option<i64>) {
        let channel_id = self.channel_id;
        let mut last_done: Option<i64> = None;
        let mut consecutive_failures: u32 = 0;
        let mut since_checkpoint: u64 = 0;
        let mut last_checkpoint = Instant::now();
        let mut outcome = ScanOutcome::Completed;

        self.state.set_cursor(start);
        self.progress.report(&self.state.snapshot());

        let mut current = start;
        while current <= end {
            if self.state.stop.is_requested() {
                outcome = ScanOutcome::Stopped;
                break;
            }
            self.state.set_cursor(current);

            let message = match self.source.get_message(channel_id, current).await {
                Ok(message) => {
                    consecutive_failures = 0;
                    Some(message)
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.state.bump(Counter::Errors);
                    warn!(
                        "Failed to fetch message {} from channel {} ({}/{}): {}",
                        current, channel_id, consecutive_failures, self.config.max_failures, e
                    );
                    if consecutive_failures >= self.config.max_failures {
                        outcome = ScanOutcome::Failed {
                            reason: format!(
                                "{} consecutive fetch failures, last at {}: {}",
                                consecutive_failures, current, e
                            ),
                        };
                        break;
                    }
                    None
                }
            };

            if let Some(message) = message {
                self.state.bump(Counter::Scanned);

                let has_media = message.has_indexable_media();
                if has_media {
                    self.process(&message).await;
                } else {
                    self.state.bump(Counter::Skipped);
                }
                last_done = Some(current);
                since_checkpoint += 1;

                if since_checkpoint >= self.config.checkpoint_every.max(1)
                    || last_checkpoint.elapsed() >= self.config.checkpoint_interval
                {
                    if let Err(e) = self.cursor.checkpoint(channel_id, current).await {
                        outcome = ScanOutcome::Failed {
                            reason: format!("checkpoint at {} failed: {}", current, e),
                        };
                        break;
                    }
                    since_checkpoint = 0;
                    last_checkpoint = Instant::now();
                    self.progress.report(&self.state.snapshot());
                }

                if has_media && current < end && !self.throttle.pause(&self.state.stop).await {
                    debug!("Stop requested during item delay after {}", current);
                }
            }

            match current.checked_add(1) {
                Some(next) => current = next,
                None => break,
            }
        }

        if let Some(done) = last_done {
            if let Err(e) = self.cursor.checkpoint(channel_id, done).await {
                let reason = format!("final checkpoint at {} failed: {}", done, e);
                outcome = match outcome {
                    ScanOutcome::Failed { reason: first } => ScanOutcome::Failed {
                        reason: format!("{}; {}", first, reason),
                    },
                    _ => ScanOutcome::Failed { reason },
                };
            }
        }
        self.progress.report(&self.state.snapshot());
        (outcome, last_done)
    }

    /// Run one media item through the pipeline, counting the result.
    async fn process(&mut self, message: &Message) {
        match self.index_item(message).await {
            Ok(ItemOutcome::Indexed {
                matched,
                rate_limited,
            }) => {
                if matched {
                    self.state.bump(Counter::Matched);
                }
                if rate_limited {
                    self.throttle.report_rate_limit();
                } else {
                    self.throttle.report_success();
                }
            }
            Ok(ItemOutcome::Duplicate { matched }) => {
                if matched {
                    self.state.bump(Counter::Matched);
                }
                self.state.bump(Counter::Duplicates);
                self.throttle.report_success();
            }
            Err(e) => {
                self.state.bump(Counter::Errors);
                if matches!(e, ItemError::Backup(SendError::RateLimited { .. })) {
                    self.throttle.report_rate_limit();
                }
                warn!(
                    "Failed to index message {} from channel {}: {}",
                    message.id, self.channel_id, e
                );
            }
        }
    }

    async fn index_item(&self, message: &Message) -> Result<ItemOutcome, ItemError> {
        let metadata = FileMetadata::from_message(message).ok_or(ItemError::NoMedia)?;
        let track = extract_track(&self.collector.collect(message));
        let matched = track.is_some();

        let existing = match self.store.find_by_key(&metadata.file_id).await? {
            Some(record) => Some(record),
            None => self.store.find_by_unique_id(&metadata.file_unique_id).await?,
        };

        let mut record = match existing {
            Some(mut existing) => {
                let mut changed = false;
                if let Some(track) = track.as_ref().filter(|_| existing.track_id.is_none()) {
                    existing.apply_track(track);
                    changed = true;
                }
                if existing.backup_file_id.is_some() || self.backup.is_none() {
                    if changed {
                        self.store.upsert_by_key(&existing).await?;
                    }
                    debug!(
                        "Message {} is a duplicate of {}",
                        message.id, existing.file_id
                    );
                    return Ok(ItemOutcome::Duplicate { matched });
                }
                existing
            }
            None => FileRecord::from_message(message, metadata, track.as_ref()),
        };

        self.store.upsert_by_key(&record).await?;

        let Some((sink, destination)) = &self.backup else {
            return Ok(ItemOutcome::Indexed {
                matched,
                rate_limited: false,
            });
        };

        let caption = format_caption(
            &MediaSource::stored(&record),
            self.config.include_track_id_in_caption,
            None,
        );
        let media = MediaRef {
            chat_id: message.chat.id,
            message_id: message.id,
            file_id: record.file_id.clone(),
            file_type: record.file_type,
        };
        let delivery = mirror_with_retry(sink.as_ref(), *destination, &media, &caption).await?;

        record.backup_file_id = Some(delivery.reference);
        self.store.upsert_by_key(&record).await?;

        Ok(ItemOutcome::Indexed {
            matched,
            rate_limited: delivery.retried,
        })
    }
}
