//! Progress reporting for indexing sessions.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::{ScanOutcome, ScanReport};
use crate::models::IndexingSession;

/// Fire-and-forget status push.
///
/// Called from inside the scan loop, so implementations must not block and
/// have no way to fail it.
pub trait ProgressSink: Send + Sync {
    fn report(&self, session: &IndexingSession);

    /// Called once with the final report.
    fn finish(&self, _report: &ScanReport) {}
}

/// Discards every report.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _session: &IndexingSession) {}
}

/// Logs reports through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, s: &IndexingSession) {
        info!(
            "Channel {}: at {} of {} (scanned {}, matched {}, errors {}, skipped {}, duplicates {})",
            s.channel_id.unwrap_or_default(),
            s.cursor_position,
            s.end_sequence,
            s.scanned_count,
            s.matched_count,
            s.error_count,
            s.skipped_count,
            s.duplicate_count
        );
    }

    fn finish(&self, report: &ScanReport) {
        info!(
            "Scan {} at {} ({} scanned, {} matched, {} errors)",
            report.outcome,
            report.last_processed,
            report.session.scanned_count,
            report.session.matched_count,
            report.session.error_count
        );
    }
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, s: &IndexingSession) {
        self.bar.set_length(s.range_len());
        let done = (s.cursor_position - s.start_sequence + 1).max(0) as u64;
        self.bar.set_position(done.min(s.range_len()));
        self.bar.set_message(format!(
            "matched {} · errors {} · skipped {}",
            s.matched_count, s.error_count, s.skipped_count
        ));
    }

    fn finish(&self, report: &ScanReport) {
        let message = match &report.outcome {
            ScanOutcome::Completed => "completed".to_string(),
            ScanOutcome::Stopped => format!("stopped at {}", report.last_processed),
            ScanOutcome::Failed { reason } => format!("failed: {}", reason),
        };
        self.bar.finish_with_message(message);
    }
}
