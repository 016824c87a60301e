//! Indexed file commands: stats, find, delete.

use console::style;

use crate::config::Settings;
use crate::repository::FileRepository;

use super::helpers::{format_bytes, print_record, require_database};

/// What `find` looks up by.
pub enum FindQuery {
    TrackId(String),
    Name(String),
    Chat(i64),
}

/// Show index statistics.
pub async fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    require_database(settings)?;
    let repo = FileRepository::new(&settings.database_path())?;
    let stats = repo.statistics()?;

    println!("\n{}", style("Index Statistics").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Files:", stats.total_files);
    println!("{:<20} {}", "Deleted:", stats.deleted_files);
    println!("{:<20} {}", "Total size:", format_bytes(stats.total_bytes));
    println!("{:<20} {}", "With track:", stats.with_track);
    println!("{:<20} {}", "Backed up:", stats.backed_up);

    if !stats.by_type.is_empty() {
        println!("\n{}", style("By type").bold());
        for (file_type, count) in &stats.by_type {
            println!("  {:<18} {}", file_type, count);
        }
    }
    if !stats.by_platform.is_empty() {
        println!("\n{}", style("By platform").bold());
        for (platform, count) in &stats.by_platform {
            println!("  {:<18} {}", platform, count);
        }
    }

    Ok(())
}

/// Look up indexed files.
pub async fn cmd_find(settings: &Settings, query: FindQuery, limit: usize) -> anyhow::Result<()> {
    require_database(settings)?;
    let repo = FileRepository::new(&settings.database_path())?;

    let mut records = match &query {
        FindQuery::TrackId(id) => repo.find_by_track_id(id)?,
        FindQuery::Name(name) => repo.find_by_name(name, limit)?,
        FindQuery::Chat(chat) => repo.list_by_chat(*chat, limit)?,
    };
    records.truncate(limit);

    if records.is_empty() {
        println!("{} No matching files", style("!").yellow());
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }
    println!("\n{} file(s)", records.len());

    Ok(())
}

/// Mark a file as deleted.
pub async fn cmd_delete(settings: &Settings, file_id: &str) -> anyhow::Result<()> {
    require_database(settings)?;
    let repo = FileRepository::new(&settings.database_path())?;

    if repo.mark_deleted(file_id)? {
        println!("{} Marked {} as deleted", style("✓").green(), file_id);
    } else {
        println!("{} No file with id {}", style("!").yellow(), file_id);
    }

    Ok(())
}
