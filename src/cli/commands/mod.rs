//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod cursor;
mod extract;
mod files;
mod helpers;
mod init;
mod scan;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "trackdex")]
#[command(about = "Index channel media by the music track links they carry")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Scan a channel from a message export and index its media
    Scan {
        /// Channel id to scan
        #[arg(allow_hyphen_values = true)]
        channel: i64,
        /// Message export to read (JSON array or JSON lines)
        #[arg(short, long)]
        export: PathBuf,
        /// First sequence to scan (default: resume from the stored cursor)
        #[arg(long)]
        start: Option<i64>,
        /// Last sequence to scan (default: latest in the channel)
        #[arg(long)]
        end: Option<i64>,
        /// Reset the stored cursor before scanning
        #[arg(long)]
        fresh: bool,
        /// Mirror media into a local outbox file
        #[arg(long)]
        outbox: Option<Option<PathBuf>>,
    },

    /// Extract a track link from text or a message
    Extract {
        /// Text to extract from
        text: Option<String>,
        /// Message JSON file (takes precedence over TEXT)
        #[arg(long, short)]
        message: Option<PathBuf>,
        /// Disable reconstruction heuristics
        #[arg(long)]
        no_heuristics: bool,
    },

    /// Manage scan cursors
    Cursor {
        #[command(subcommand)]
        command: CursorCommands,
    },

    /// Show index statistics
    Stats,

    /// Look up indexed files
    Find {
        /// Match by track id
        #[arg(long, conflicts_with_all = ["name", "chat"])]
        track_id: Option<String>,
        /// Match by file name
        #[arg(long, conflicts_with = "chat")]
        name: Option<String>,
        /// List files from a chat
        #[arg(long, allow_hyphen_values = true)]
        chat: Option<i64>,
        /// Maximum results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Mark an indexed file as deleted
    Delete {
        /// File id to delete
        file_id: String,
    },
}

#[derive(Subcommand)]
enum CursorCommands {
    /// Show stored cursors
    Show {
        /// Channel id (shows all channels if omitted)
        #[arg(allow_hyphen_values = true)]
        channel: Option<i64>,
    },
    /// Forget a channel's cursor so the next scan starts over
    Reset {
        #[arg(allow_hyphen_values = true)]
        channel: i64,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Scan {
            channel,
            export,
            start,
            end,
            fresh,
            outbox,
        } => {
            let options = scan::ScanOptions {
                channel,
                export,
                start,
                end,
                fresh,
                outbox,
                verbose: cli.verbose,
            };
            scan::cmd_scan(&settings, options).await
        }
        Commands::Extract {
            text,
            message,
            no_heuristics,
        } => extract::cmd_extract(&settings, text, message, no_heuristics).await,
        Commands::Cursor { command } => match command {
            CursorCommands::Show { channel } => cursor::cmd_cursor_show(&settings, channel).await,
            CursorCommands::Reset { channel } => cursor::cmd_cursor_reset(&settings, channel).await,
        },
        Commands::Stats => files::cmd_stats(&settings).await,
        Commands::Find {
            track_id,
            name,
            chat,
            limit,
        } => {
            let query = match (track_id, name, chat) {
                (Some(id), _, _) => files::FindQuery::TrackId(id),
                (_, Some(name), _) => files::FindQuery::Name(name),
                (_, _, Some(chat)) => files::FindQuery::Chat(chat),
                _ => anyhow::bail!("Specify one of --track-id, --name, or --chat"),
            };
            files::cmd_find(&settings, query, limit).await
        }
        Commands::Delete { file_id } => files::cmd_delete(&settings, &file_id).await,
    }
}
