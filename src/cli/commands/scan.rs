//! Channel scan command.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::repository::SqliteStore;
use crate::services::backup::{BackupSink, OutboxBackupSink};
use crate::services::indexer::{BarProgress, Indexer, ProgressSink, ScanOutcome, TracingProgress};
use crate::source::JsonExportSource;

pub struct ScanOptions {
    pub channel: i64,
    pub export: PathBuf,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub fresh: bool,
    /// `Some(None)` mirrors into the default outbox path.
    pub outbox: Option<Option<PathBuf>>,
    pub verbose: bool,
}

/// Scan a channel from an export file.
pub async fn cmd_scan(settings: &Settings, options: ScanOptions) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let source = JsonExportSource::load(&options.export).await.map_err(|e| {
        anyhow::anyhow!("Failed to load export {}: {}", options.export.display(), e)
    })?;
    if !source.channels().contains(&options.channel) {
        println!(
            "{} Export {} has no messages for channel {}",
            style("!").yellow(),
            options.export.display(),
            options.channel
        );
    }

    let db_path = settings.database_path();
    let store = Arc::new(tokio::task::spawn_blocking(move || SqliteStore::open(&db_path)).await??);

    let progress: Arc<dyn ProgressSink> = if options.verbose {
        Arc::new(TracingProgress)
    } else {
        Arc::new(BarProgress::new())
    };

    let mut indexer = Indexer::new(Arc::new(source), store, settings.indexer_config())
        .with_progress(progress);

    if options.fresh {
        indexer.cursor().reset(options.channel).await?;
        println!(
            "{} Cleared cursor for channel {}",
            style("✓").green(),
            options.channel
        );
    }

    if settings.backup_channel_id.is_none() {
        tracing::warn!("No backup channel configured, mirroring disabled");
    }
    if let Some(outbox) = options.outbox {
        if settings.backup_channel_id.is_none() {
            println!(
                "{} --outbox given but no backup channel is configured, skipping mirroring",
                style("!").yellow()
            );
        } else {
            let path = outbox.unwrap_or_else(|| settings.outbox_path());
            let sink: Arc<dyn BackupSink> = Arc::new(OutboxBackupSink::new(&path));
            indexer = indexer.with_backup(sink);
        }
    }

    let indexer = Arc::new(indexer);
    let handle = indexer.start_scan(options.channel, options.start, options.end)?;

    let stopper = indexer.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.request_stop();
            eprintln!(
                "\n{} Stopping after the current message...",
                style("!").yellow()
            );
        }
    });

    let report = handle.wait().await;
    ctrl_c.abort();
    let report = report?;
    let session = &report.session;

    println!();
    println!("{}", style(format!("Scan of channel {}", options.channel)).bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Outcome:", report.outcome);
    println!(
        "{:<20} {}..{}",
        "Range:", session.start_sequence, session.end_sequence
    );
    println!("{:<20} {}", "Checkpoint:", report.last_processed);
    println!("{:<20} {}", "Scanned:", session.scanned_count);
    println!("{:<20} {}", "Matched:", session.matched_count);
    println!("{:<20} {}", "Skipped:", session.skipped_count);
    println!("{:<20} {}", "Duplicates:", session.duplicate_count);
    println!("{:<20} {}", "Errors:", session.error_count);

    match report.outcome {
        ScanOutcome::Completed => {
            println!("{} Scan complete", style("✓").green());
            Ok(())
        }
        ScanOutcome::Stopped => {
            println!(
                "{} Scan stopped, run again to resume from {}",
                style("!").yellow(),
                report.last_processed.max(0).saturating_add(1)
            );
            Ok(())
        }
        ScanOutcome::Failed { reason } => anyhow::bail!("Scan failed: {}", reason),
    }
}
