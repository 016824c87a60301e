//! Caption formatting for mirrored media.

use crate::extract::{collect_candidates, extract_track};
use crate::models::{MediaSource, TrackMatch};

/// Caption limit of the messaging platform, in characters.
pub const MAX_CAPTION_CHARS: usize = 1024;

const SEPARATOR_LINE: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Format a duration in seconds as `MM:SS`.
pub fn format_duration(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format a byte count as megabytes with two decimals.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Build the caption posted alongside a backup copy.
///
/// The track comes from `track_override` when given; otherwise stored
/// records use their saved track and live messages are extracted on the spot.
/// With `include_track_id` the id is pulled to the top so it is searchable
/// in the backup channel.
pub fn format_caption(
    source: &MediaSource<'_>,
    include_track_id: bool,
    track_override: Option<&TrackMatch>,
) -> String {
    let track = match track_override {
        Some(track) => Some(track.clone()),
        None => source.stored_track().or_else(|| {
            source
                .message()
                .and_then(|message| extract_track(&collect_candidates(message)))
        }),
    };

    let mut lines = Vec::new();

    if include_track_id {
        if let Some(track) = &track {
            lines.push(format!("🆔 TRACK ID: {}", track.track_id));
            lines.push(SEPARATOR_LINE.to_string());
        }
    }

    lines.push(format!("🎵 {}", source.file_name()));
    lines.push(format!("📁 Type: {}", source.file_type().label()));

    if let Some(size) = source.file_size().filter(|s| *s > 0) {
        lines.push(format!("💾 Size: {}", format_megabytes(size)));
    }
    if let Some(duration) = source.duration().filter(|d| *d > 0) {
        lines.push(format!("🕒 Duration: {}", format_duration(duration)));
    }
    if let Some((width, height)) = source.dimensions() {
        lines.push(format!("📐 Resolution: {}x{}", width, height));
    }

    if let Some(track) = &track {
        lines.push(format!("🔗 Track: {}", track.canonical_url));
        lines.push(format!("🎧 Platform: {}", track.platform));
        if !include_track_id {
            lines.push(format!("🆔 ID: {}", track.track_id));
        }
    }

    lines.push(format!(
        "📍 Source: {}",
        source.chat_title().unwrap_or("Unknown Channel")
    ));
    lines.push(format!("📅 Date: {}", source.date().format("%Y-%m-%d")));

    truncate_chars(lines.join("\n"), MAX_CAPTION_CHARS)
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => {
            let mut cut = text[..idx].to_string();
            cut.pop();
            cut.push('…');
            cut
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chat, FileInfo, FileMetadata, FileRecord, Media, Message, Platform};
    use chrono::{TimeZone, Utc};

    fn audio_message(caption: &str) -> Message {
        let mut msg = Message::new(-1001, 3, Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap());
        msg.chat = Chat {
            id: -1001,
            title: Some("Late Night Drops".into()),
        };
        msg.caption = Some(caption.into());
        msg.media = Some(Media::Audio(FileInfo {
            file_id: "F".into(),
            file_unique_id: "U".into(),
            file_name: Some("track.mp3".into()),
            file_size: Some(5 * 1024 * 1024),
            duration: Some(125),
            ..Default::default()
        }));
        msg
    }

    #[test]
    fn test_live_caption_extracts_track() {
        let msg = audio_message("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC");
        let source = MediaSource::live(&msg).unwrap();
        let caption = format_caption(&source, true, None);
        let lines: Vec<&str> = caption.lines().collect();

        assert_eq!(lines[0], "🆔 TRACK ID: 4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(lines[1], SEPARATOR_LINE);
        assert!(caption.contains("🎵 track.mp3"));
        assert!(caption.contains("💾 Size: 5.00 MB"));
        assert!(caption.contains("🕒 Duration: 02:05"));
        assert!(caption.contains("📍 Source: Late Night Drops"));
        assert!(caption.contains("📅 Date: 2024-05-17"));
        assert!(!caption.contains("🆔 ID:"));
    }

    #[test]
    fn test_stored_record_without_track() {
        let msg = audio_message("no links here");
        let meta = FileMetadata::from_message(&msg).unwrap();
        let mut record = FileRecord::from_message(&msg, meta, None);
        record.chat_title = None;

        let caption = format_caption(&MediaSource::stored(&record), true, None);
        assert!(caption.starts_with("🎵 track.mp3"));
        assert!(caption.contains("📍 Source: Unknown Channel"));
        assert!(!caption.contains("Track"));
    }

    #[test]
    fn test_override_wins_and_id_listed_inline() {
        let msg = audio_message("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC");
        let source = MediaSource::live(&msg).unwrap();
        let track = TrackMatch {
            platform: Platform::YoutubeShort,
            track_id: "dQw4w9WgXcQ".into(),
            canonical_url: "https://youtu.be/dQw4w9WgXcQ".into(),
        };
        let caption = format_caption(&source, false, Some(&track));
        assert!(caption.contains("🔗 Track: https://youtu.be/dQw4w9WgXcQ"));
        assert!(caption.contains("🆔 ID: dQw4w9WgXcQ"));
        assert!(caption.contains("🎧 Platform: youtube_short"));
    }

    #[test]
    fn test_long_captions_truncated() {
        let long = "x".repeat(2000);
        let out = truncate_chars(long, MAX_CAPTION_CHARS);
        assert_eq!(out.chars().count(), MAX_CAPTION_CHARS);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3600), "60:00");
    }
}
