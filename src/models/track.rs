//! Track identity and extraction candidates.

use serde::{Deserialize, Serialize};

/// Music platform a track link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Spotify,
    Jiosaavn,
    Youtube,
    YoutubeShort,
    Soundcloud,
    AppleMusic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify",
            Self::Jiosaavn => "jiosaavn",
            Self::Youtube => "youtube",
            Self::YoutubeShort => "youtube_short",
            Self::Soundcloud => "soundcloud",
            Self::AppleMusic => "apple_music",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "spotify" => Some(Self::Spotify),
            "jiosaavn" => Some(Self::Jiosaavn),
            "youtube" => Some(Self::Youtube),
            "youtube_short" => Some(Self::YoutubeShort),
            "soundcloud" => Some(Self::Soundcloud),
            "apple_music" => Some(Self::AppleMusic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved track identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMatch {
    pub platform: Platform,
    pub track_id: String,
    pub canonical_url: String,
}

/// Where a candidate string came from.
///
/// Variants are listed in descending order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    PlainText,
    EntityLink,
    CaptionEntityLink,
    ButtonLink,
    Reconstructed,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::EntityLink => "entity_link",
            Self::CaptionEntityLink => "caption_entity_link",
            Self::ButtonLink => "button_link",
            Self::Reconstructed => "reconstructed",
        }
    }
}

/// A text or URL fragment considered for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub source: CandidateSource,
    pub raw_value: String,
}

impl Candidate {
    pub fn new(source: CandidateSource, raw_value: impl Into<String>) -> Self {
        Self {
            source,
            raw_value: raw_value.into(),
        }
    }

    /// Plain-text candidate, handy for one-off extraction.
    pub fn text(raw_value: impl Into<String>) -> Self {
        Self::new(CandidateSource::PlainText, raw_value)
    }
}
