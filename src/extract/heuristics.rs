//! Last-resort reconstruction of track links from mangled text.
//!
//! Every heuristic here can produce false positives, so the collector only
//! runs them when no direct URL was found, and each one can be disabled
//! through configuration.

use std::sync::LazyLock;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalize::normalize;
use super::patterns::contains_url;

/// Characters after an "info" token searched for a bare track id.
const NEAR_INFO_WINDOW: usize = 64;

/// Length of a Spotify base62 track id.
const SPOTIFY_ID_LEN: usize = 22;

static INFO_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)info").unwrap());

static BASE64_AFTER_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)info[\s:|>\-]*([A-Za-z0-9+/_\-]{20,}={0,2})").unwrap()
});

static ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

/// Hosts that are worth rejoining when split apart by whitespace.
const SPLIT_HOSTS: &[&str] = &[
    "open.spotify.com",
    "jiosaavn.com",
    "youtube.com",
    "youtu.be",
    "music.apple.com",
    "soundcloud.com",
];

static SPLIT_HOST_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SPLIT_HOSTS
        .iter()
        .map(|host| {
            let host_pattern = host
                .split('.')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s*\.\s*");
            let pattern = format!(
                r"(?i)(?:https?\s*:\s*/\s*/\s*)?(?:www\s*\.\s*)?{}((?:\s*/\s*[^\s/]+)+)",
                host_pattern
            );
            (*host, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// A reconstruction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionHeuristic {
    /// Decode a base64 payload that follows an "info" token.
    Base64AfterInfo,
    /// Turn a bare 22-character id near an "info" token into a Spotify link.
    SpotifyIdNearInfo,
    /// Rejoin a hostname split by whitespace, e.g. `open . spotify . com / track / id`.
    SplitHostname,
}

impl ReconstructionHeuristic {
    /// All heuristics, in the order they are tried.
    pub const ALL: [Self; 3] = [
        Self::Base64AfterInfo,
        Self::SpotifyIdNearInfo,
        Self::SplitHostname,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64AfterInfo => "base64_after_info",
            Self::SpotifyIdNearInfo => "spotify_id_near_info",
            Self::SplitHostname => "split_hostname",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "base64_after_info" => Some(Self::Base64AfterInfo),
            "spotify_id_near_info" => Some(Self::SpotifyIdNearInfo),
            "split_hostname" => Some(Self::SplitHostname),
            _ => None,
        }
    }

    /// Candidate strings this heuristic recovers from normalized text.
    pub fn apply(&self, text: &str) -> Vec<String> {
        match self {
            Self::Base64AfterInfo => decode_base64_after_info(text),
            Self::SpotifyIdNearInfo => spotify_ids_near_info(text),
            Self::SplitHostname => rejoin_split_hosts(text),
        }
    }
}

fn decode_base64_after_info(text: &str) -> Vec<String> {
    BASE64_AFTER_INFO
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| decode_base64(m.as_str()))
        .map(|decoded| normalize(&decoded))
        .filter(|decoded| contains_url(decoded))
        .collect()
}

fn decode_base64(payload: &str) -> Option<String> {
    let bytes = [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(payload).ok())?;
    String::from_utf8(bytes).ok()
}

fn spotify_ids_near_info(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for info in INFO_TOKEN.find_iter(text) {
        let rest = &text[info.end()..];
        let window_end = rest
            .char_indices()
            .nth(NEAR_INFO_WINDOW)
            .map_or(rest.len(), |(i, _)| i);
        // A run only has to start inside the window.
        for run in ALNUM_RUN
            .find_iter(rest)
            .take_while(|run| run.start() < window_end)
        {
            if run.as_str().len() == SPOTIFY_ID_LEN {
                found.push(format!("https://open.spotify.com/track/{}", run.as_str()));
            }
        }
    }
    found
}

fn rejoin_split_hosts(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for (host, pattern) in SPLIT_HOST_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(path) = caps.get(1) else { continue };
            let path: String = path.as_str().split_whitespace().collect();
            found.push(format!("https://{}{}", host, path));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_after_info_decodes_url() {
        let payload = STANDARD.encode("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC");
        let text = format!("@bot | info {}", payload);
        assert_eq!(
            ReconstructionHeuristic::Base64AfterInfo.apply(&text),
            vec!["https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC".to_string()]
        );
    }

    #[test]
    fn test_base64_ignores_non_url_payloads() {
        let payload = STANDARD.encode("just some words that are not a link");
        let text = format!("info: {}", payload);
        assert!(ReconstructionHeuristic::Base64AfterInfo.apply(&text).is_empty());
    }

    #[test]
    fn test_spotify_id_near_info() {
        let text = "@bot | info 4uLU6hMCjMI75M1A2tKUQC";
        assert_eq!(
            ReconstructionHeuristic::SpotifyIdNearInfo.apply(text),
            vec!["https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC".to_string()]
        );
    }

    #[test]
    fn test_spotify_id_too_far_from_info_is_ignored() {
        let filler = "x ".repeat(40);
        let text = format!("info {}4uLU6hMCjMI75M1A2tKUQC", filler);
        assert!(ReconstructionHeuristic::SpotifyIdNearInfo
            .apply(&text)
            .is_empty());
    }

    #[test]
    fn test_long_run_crossing_window_edge_is_not_truncated() {
        let text = format!("info {} ABCDEFGHIJKLMNOPQRSTUVWXYZ0123", "x".repeat(40));
        assert!(ReconstructionHeuristic::SpotifyIdNearInfo
            .apply(&text)
            .is_empty());

        let text = format!("info {} ABCDEFGHIJKLMNOPQRSTUVWXYZ0123", "x".repeat(50));
        assert!(ReconstructionHeuristic::SpotifyIdNearInfo
            .apply(&text)
            .is_empty());
    }

    #[test]
    fn test_spotify_id_starting_inside_window_is_kept_whole() {
        let text = format!("info {} 4uLU6hMCjMI75M1A2tKUQC", "x".repeat(50));
        assert_eq!(
            ReconstructionHeuristic::SpotifyIdNearInfo.apply(&text),
            vec!["https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC".to_string()]
        );
    }

    #[test]
    fn test_spotify_id_requires_exact_length() {
        let text = "info 4uLU6hMCjMI75M1A2tKUQCX";
        assert!(ReconstructionHeuristic::SpotifyIdNearInfo
            .apply(text)
            .is_empty());
    }

    #[test]
    fn test_split_hostname_rejoined() {
        let text = "grab it: open . spotify . com / track / 4uLU6hMCjMI75M1A2tKUQC";
        assert_eq!(
            ReconstructionHeuristic::SplitHostname.apply(text),
            vec!["https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC".to_string()]
        );
    }

    #[test]
    fn test_split_hostname_with_scheme() {
        let text = "https : // youtu . be / dQw4w9WgXcQ";
        assert_eq!(
            ReconstructionHeuristic::SplitHostname.apply(text),
            vec!["https://youtu.be/dQw4w9WgXcQ".to_string()]
        );
    }

    #[test]
    fn test_heuristic_names_round_trip() {
        for h in ReconstructionHeuristic::ALL {
            assert_eq!(ReconstructionHeuristic::from_str(h.as_str()), Some(h));
        }
    }
}
