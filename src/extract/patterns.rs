//! Platform URL table and first-match track extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::normalize::normalize;
use crate::models::{Candidate, Platform, TrackMatch};

/// An `http(s)://` token, ending at whitespace or a closing bracket/quote.
static URL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s)\]<>"'`]+"#).unwrap());

/// How the track id is pulled out of a matching URL.
#[derive(Debug, Clone, Copy)]
enum TrackIdRule {
    /// First capture group of the pattern.
    Capture,
    /// Last non-empty path segment of the URL.
    LastPathSegment,
}

struct PlatformPattern {
    platform: Platform,
    regex: Regex,
    id_rule: TrackIdRule,
}

/// Checked in order for every URL token; the first hit wins.
static PLATFORM_PATTERNS: LazyLock<Vec<PlatformPattern>> = LazyLock::new(|| {
    vec![
        PlatformPattern {
            platform: Platform::Spotify,
            regex: Regex::new(
                r"(?i)^https?://open\.spotify\.com/(?:intl-[a-z]{2}/)?track/([A-Za-z0-9]+)",
            )
            .unwrap(),
            id_rule: TrackIdRule::Capture,
        },
        PlatformPattern {
            platform: Platform::Jiosaavn,
            regex: Regex::new(r"(?i)^https?://(?:www\.)?jiosaavn\.com/song/[^/]+/([A-Za-z0-9_\-]+)")
                .unwrap(),
            id_rule: TrackIdRule::Capture,
        },
        PlatformPattern {
            platform: Platform::Youtube,
            regex: Regex::new(
                r"(?i)^https?://(?:www\.|m\.|music\.)?youtube\.com/watch\?(?:[^#\s]*&)?v=([A-Za-z0-9_\-]+)",
            )
            .unwrap(),
            id_rule: TrackIdRule::Capture,
        },
        PlatformPattern {
            platform: Platform::YoutubeShort,
            regex: Regex::new(r"(?i)^https?://youtu\.be/([A-Za-z0-9_\-]+)").unwrap(),
            id_rule: TrackIdRule::Capture,
        },
        PlatformPattern {
            platform: Platform::AppleMusic,
            regex: Regex::new(r"(?i)^https?://music\.apple\.com/[^/]+/album/[^/]+/([0-9]+)")
                .unwrap(),
            id_rule: TrackIdRule::Capture,
        },
        PlatformPattern {
            platform: Platform::Soundcloud,
            regex: Regex::new(r"(?i)^https?://(?:www\.|m\.)?soundcloud\.com/[\w\-]+/[\w\-]+")
                .unwrap(),
            id_rule: TrackIdRule::LastPathSegment,
        },
    ]
});

/// Whether `text` contains an `http(s)://` token.
pub fn contains_url(text: &str) -> bool {
    URL_TOKEN.is_match(text)
}

/// All URL tokens in `text`, in position order, with trailing punctuation trimmed.
pub fn find_urls(text: &str) -> Vec<String> {
    URL_TOKEN
        .find_iter(text)
        .map(|m| trim_url(m.as_str()).to_string())
        .filter(|u| u.contains("://") && !u.ends_with("://"))
        .collect()
}

/// Drop sentence punctuation and unbalanced closers from the end of a URL.
fn trim_url(url: &str) -> &str {
    let mut url = url;
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', '*', '"', '\'']);
        let trimmed = match trimmed.chars().last() {
            Some(')') if trimmed.matches('(').count() < trimmed.matches(')').count() => {
                &trimmed[..trimmed.len() - 1]
            }
            Some(']') if trimmed.matches('[').count() < trimmed.matches(']').count() => {
                &trimmed[..trimmed.len() - 1]
            }
            _ => trimmed,
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

/// Match a single URL against the platform table.
pub fn match_url(url: &str) -> Option<TrackMatch> {
    PLATFORM_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.regex.captures(url)?;
        let track_id = match pattern.id_rule {
            TrackIdRule::Capture => caps.get(1)?.as_str().to_string(),
            TrackIdRule::LastPathSegment => last_path_segment(url)?,
        };
        Some(TrackMatch {
            platform: pattern.platform,
            track_id,
            canonical_url: url.to_string(),
        })
    })
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Resolve the first candidate that yields a track.
///
/// Candidates are tried in order; within a candidate, URL tokens are tried in
/// position order and each is checked against the platform table in order.
pub fn extract_track(candidates: &[Candidate]) -> Option<TrackMatch> {
    for (index, candidate) in candidates.iter().enumerate() {
        let text = normalize(&candidate.raw_value);
        for url in find_urls(&text) {
            if let Some(track) = match_url(&url) {
                debug!(
                    "Matched {} track {} from {} candidate (skipped {})",
                    track.platform,
                    track.track_id,
                    candidate.source.as_str(),
                    index
                );
                return Some(track);
            }
        }
    }
    debug!("No track in {} candidates", candidates.len());
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(url: &str) -> Option<TrackMatch> {
        extract_track(&[Candidate::text(url)])
    }

    #[test]
    fn test_every_platform_matches() {
        let cases = [
            (
                "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC",
                Platform::Spotify,
                "4uLU6hMCjMI75M1A2tKUQC",
            ),
            (
                "https://www.jiosaavn.com/song/tum-hi-ho/EToxUyFpcwQ",
                Platform::Jiosaavn,
                "EToxUyFpcwQ",
            ),
            (
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                Platform::Youtube,
                "dQw4w9WgXcQ",
            ),
            (
                "https://youtu.be/dQw4w9WgXcQ",
                Platform::YoutubeShort,
                "dQw4w9WgXcQ",
            ),
            (
                "https://music.apple.com/us/album/blinding-lights/1499378108",
                Platform::AppleMusic,
                "1499378108",
            ),
            (
                "https://soundcloud.com/artist-name/track-name",
                Platform::Soundcloud,
                "track-name",
            ),
        ];
        for (url, platform, id) in cases {
            let track = single(url).unwrap_or_else(|| panic!("no match for {}", url));
            assert_eq!(track.platform, platform);
            assert_eq!(track.track_id, id);
            assert_eq!(track.canonical_url, url);
        }
    }

    #[test]
    fn test_youtube_v_param_not_first() {
        let track = single("https://youtube.com/watch?feature=share&v=abc_DEF-123").unwrap();
        assert_eq!(track.track_id, "abc_DEF-123");
    }

    #[test]
    fn test_trailing_punctuation_trimmed() {
        let track = single("(see https://youtu.be/dQw4w9WgXcQ).").unwrap();
        assert_eq!(track.canonical_url, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_soundcloud_ignores_query_for_id() {
        let track = single("https://soundcloud.com/someone/a-song?si=xyz").unwrap();
        assert_eq!(track.track_id, "a-song");
    }

    #[test]
    fn test_url_glued_to_info_token() {
        let track = single("@bot | info\u{2063}https://open.spotify.com/track/5NTULYCC6xsFCNTsm1WpuQ")
            .unwrap();
        assert_eq!(track.track_id, "5NTULYCC6xsFCNTsm1WpuQ");
    }

    #[test]
    fn test_scheme_required() {
        assert!(single("open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC").is_none());
    }

    #[test]
    fn test_album_links_do_not_match_spotify() {
        assert!(single("https://open.spotify.com/album/4uLU6hMCjMI75M1A2tKUQC").is_none());
    }

    #[test]
    fn test_first_url_in_candidate_wins() {
        let track = single("https://youtu.be/first https://open.spotify.com/track/second").unwrap();
        assert_eq!(track.platform, Platform::YoutubeShort);
        assert_eq!(track.track_id, "first");
    }

    #[test]
    fn test_find_urls_skips_bare_scheme() {
        assert!(find_urls("https://").is_empty());
        assert_eq!(
            find_urls("a https://x.io/a, and http://y.io."),
            vec!["https://x.io/a".to_string(), "http://y.io".to_string()]
        );
    }
}
