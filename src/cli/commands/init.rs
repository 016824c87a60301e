//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::init_database;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let db_path = settings.database_path();
    tokio::task::spawn_blocking(move || init_database(&db_path)).await??;

    if settings.backup_channel_id.is_none() {
        println!(
            "{} No backup channel configured, media will not be mirrored",
            style("!").yellow()
        );
        println!("  Set BACKUP_CHANNEL_ID or backup_channel_id in trackdex.toml to enable it");
    }

    println!(
        "{} Initialized trackdex in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
