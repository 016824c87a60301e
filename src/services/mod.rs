//! Service layer for trackdex.
//!
//! Domain logic separated from the CLI: backup mirroring, caption
//! formatting, and the indexing loop.

pub mod backup;
pub mod caption;
pub mod indexer;

pub use backup::{mirror_with_retry, BackupSink, Delivery, MediaRef, OutboxBackupSink, SendError};
pub use caption::format_caption;
pub use indexer::{Indexer, IndexerConfig, IndexerError, ScanHandle, ScanOutcome, ScanReport};
