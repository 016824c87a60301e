//! Scan cursor commands.

use console::style;

use crate::config::Settings;
use crate::models::ScanCursorState;
use crate::repository::CursorRepository;

use super::helpers::require_database;

fn print_cursor(cursor: &ScanCursorState) {
    let target = cursor
        .target_sequence
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    let updated = cursor
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "  {:<20} {:>10} / {:<10} {}",
        cursor.channel_id,
        cursor.last_indexed_sequence,
        target,
        style(updated).dim()
    );
}

/// Show stored cursors.
pub async fn cmd_cursor_show(settings: &Settings, channel: Option<i64>) -> anyhow::Result<()> {
    require_database(settings)?;
    let repo = CursorRepository::new(&settings.database_path())?;

    let cursors = match channel {
        Some(id) => vec![repo.get(id)?],
        None => repo.list()?,
    };

    if cursors.is_empty() {
        println!("{} No scan cursors stored", style("!").yellow());
        return Ok(());
    }

    println!(
        "  {:<20} {:>10} / {:<10} {}",
        style("Channel").bold(),
        style("Indexed").bold(),
        style("Target").bold(),
        style("Updated").bold()
    );
    for cursor in &cursors {
        print_cursor(cursor);
    }

    Ok(())
}

/// Forget a channel's cursor.
pub async fn cmd_cursor_reset(settings: &Settings, channel: i64) -> anyhow::Result<()> {
    require_database(settings)?;
    let repo = CursorRepository::new(&settings.database_path())?;

    if repo.reset(channel)? {
        println!("{} Reset cursor for channel {}", style("✓").green(), channel);
    } else {
        println!("{} No cursor stored for channel {}", style("!").yellow(), channel);
    }

    Ok(())
}
