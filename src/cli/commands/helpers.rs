//! Shared helper functions for CLI commands.

use console::style;

use crate::config::Settings;
use crate::models::FileRecord;

/// Format bytes as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.2} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Bail out with a hint when the database has not been created yet.
pub fn require_database(settings: &Settings) -> anyhow::Result<()> {
    if !settings.database_exists() {
        anyhow::bail!(
            "No database at {} (run `trackdex init` first)",
            settings.database_path().display()
        );
    }
    Ok(())
}

/// Print one file record as a summary line.
pub fn print_record(record: &FileRecord) {
    let track = match (&record.platform, &record.track_id) {
        (Some(platform), Some(id)) => format!("{}:{}", platform, id),
        _ => style("no track").dim().to_string(),
    };
    let deleted = if record.is_deleted {
        format!(" {}", style("[deleted]").red())
    } else {
        String::new()
    };
    println!(
        "  {} {} ({}, {}) {}{}",
        style(&record.file_id).cyan(),
        record.file_name,
        record.file_type.label(),
        format_bytes(record.file_size.unwrap_or(0)),
        track,
        deleted
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(1_500), "1.50 KB");
        assert_eq!(format_bytes(2_000_000), "2.00 MB");
        assert_eq!(format_bytes(3_250_000_000), "3.25 GB");
    }
}
