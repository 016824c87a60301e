//! Track extraction command.

use std::path::PathBuf;

use chrono::Utc;
use console::style;

use crate::config::Settings;
use crate::extract::{extract_track, CandidateCollector};
use crate::models::Message;

/// Extract a track link from free text or a message JSON file.
pub async fn cmd_extract(
    settings: &Settings,
    text: Option<String>,
    message: Option<PathBuf>,
    no_heuristics: bool,
) -> anyhow::Result<()> {
    let collector = if no_heuristics {
        CandidateCollector::without_heuristics()
    } else {
        CandidateCollector::new(settings.heuristics.clone())
    };

    let message = match (message, text) {
        (Some(path), _) => {
            let json = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<Message>(&json)
                .map_err(|e| anyhow::anyhow!("Invalid message in {}: {}", path.display(), e))?
        }
        (None, Some(text)) => {
            let mut message = Message::new(0, 0, Utc::now());
            message.text = Some(text);
            message
        }
        (None, None) => anyhow::bail!("Provide TEXT or --message"),
    };
    let candidates = collector.collect(&message);

    println!("{}", style("Candidates").bold());
    println!("{}", "-".repeat(40));
    if candidates.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for candidate in &candidates {
        println!(
            "  {:<22} {}",
            style(candidate.source.as_str()).cyan(),
            candidate.raw_value
        );
    }
    println!();

    match extract_track(&candidates) {
        Some(track) => {
            println!("{} Found track", style("✓").green());
            println!("{:<20} {}", "Platform:", track.platform);
            println!("{:<20} {}", "Track ID:", track.track_id);
            println!("{:<20} {}", "URL:", track.canonical_url);
        }
        None => println!("{} No track link found", style("!").yellow()),
    }

    Ok(())
}
