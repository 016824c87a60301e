//! Gathering every URL-bearing fragment of a message.

use std::collections::HashSet;

use tracing::debug;

use super::heuristics::ReconstructionHeuristic;
use super::normalize::normalize;
use super::patterns::{contains_url, find_urls, match_url};
use crate::models::{Candidate, CandidateSource, EntityType, Message, MessageEntity};

/// Ordered candidate list with exact-string dedup.
#[derive(Debug, Default)]
struct CandidateSet {
    items: Vec<Candidate>,
    seen: HashSet<String>,
}

impl CandidateSet {
    fn push(&mut self, source: CandidateSource, raw: &str) {
        let value = normalize(raw);
        if value.is_empty() || !self.seen.insert(value.clone()) {
            return;
        }
        self.items.push(Candidate::new(source, value));
    }

    /// Whether any candidate already carries a URL of a known platform.
    fn has_track_url(&self) -> bool {
        self.items
            .iter()
            .any(|c| find_urls(&c.raw_value).iter().any(|u| match_url(u).is_some()))
    }
}

/// Collects extraction candidates from a message, most trusted first.
#[derive(Debug, Clone)]
pub struct CandidateCollector {
    heuristics: Vec<ReconstructionHeuristic>,
}

impl Default for CandidateCollector {
    fn default() -> Self {
        Self::new(ReconstructionHeuristic::ALL.to_vec())
    }
}

impl CandidateCollector {
    pub fn new(heuristics: Vec<ReconstructionHeuristic>) -> Self {
        Self { heuristics }
    }

    /// Collector that never reconstructs.
    pub fn without_heuristics() -> Self {
        Self::new(Vec::new())
    }

    pub fn heuristics(&self) -> &[ReconstructionHeuristic] {
        &self.heuristics
    }

    /// Collect candidates in source priority order.
    ///
    /// Text and caption come first, then link entities over the text, then
    /// caption entities, then button targets. Reconstruction heuristics run
    /// last and only when nothing before them yielded a platform URL; links
    /// to other sites do not suppress them.
    pub fn collect(&self, message: &Message) -> Vec<Candidate> {
        let mut set = CandidateSet::default();

        for text in [message.text.as_deref(), message.caption.as_deref()]
            .into_iter()
            .flatten()
        {
            set.push(CandidateSource::PlainText, text);
        }

        if let Some(text) = message.text.as_deref() {
            collect_entities(&mut set, CandidateSource::EntityLink, text, &message.entities);
        }
        if let Some(caption) = message.caption.as_deref() {
            collect_entities(
                &mut set,
                CandidateSource::CaptionEntityLink,
                caption,
                &message.caption_entities,
            );
        }

        for button in message.buttons.iter().flatten() {
            if let Some(url) = button.url.as_deref() {
                if contains_url(&normalize(url)) {
                    set.push(CandidateSource::ButtonLink, url);
                }
            }
        }

        if !set.has_track_url() && !self.heuristics.is_empty() {
            self.reconstruct(&mut set, message);
        }

        debug!(
            "Collected {} candidates from message {}",
            set.items.len(),
            message.id
        );
        set.items
    }

    fn reconstruct(&self, set: &mut CandidateSet, message: &Message) {
        let texts: Vec<String> = [message.text.as_deref(), message.caption.as_deref()]
            .into_iter()
            .flatten()
            .map(normalize)
            .filter(|t| !t.is_empty())
            .collect();

        for heuristic in &self.heuristics {
            for text in &texts {
                for recovered in heuristic.apply(text) {
                    debug!("{} recovered {}", heuristic.as_str(), recovered);
                    set.push(CandidateSource::Reconstructed, &recovered);
                }
            }
        }
    }
}

/// Explicit-target links first, then bare URL spans sliced from the original text.
fn collect_entities(
    set: &mut CandidateSet,
    source: CandidateSource,
    text: &str,
    entities: &[MessageEntity],
) {
    for entity in entities {
        if entity.kind == EntityType::TextLink {
            if let Some(url) = entity.url.as_deref() {
                set.push(source, url);
            }
        }
    }

    for entity in entities {
        let bare = match entity.kind {
            EntityType::Url => true,
            EntityType::TextLink => entity.url.is_none(),
            EntityType::Other => false,
        };
        if !bare {
            continue;
        }
        let Some(slice) = entity.slice(text) else {
            debug!(
                "Entity span {}+{} out of range for {} UTF-16 units",
                entity.offset,
                entity.length,
                text.encode_utf16().count()
            );
            continue;
        };
        let value = normalize(slice);
        if value.starts_with("http") {
            set.push(source, &value);
        }
    }
}

/// Collect candidates with every heuristic enabled.
pub fn collect_candidates(message: &Message) -> Vec<Candidate> {
    CandidateCollector::default().collect(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InlineButton;
    use chrono::Utc;

    fn message() -> Message {
        Message::new(-100, 1, Utc::now())
    }

    fn sources(candidates: &[Candidate]) -> Vec<CandidateSource> {
        candidates.iter().map(|c| c.source).collect()
    }

    #[test]
    fn test_order_follows_source_priority() {
        let mut msg = message();
        msg.text = Some("check this https://example.com/a".into());
        msg.entities = vec![
            MessageEntity::bare_url(11, 21),
            MessageEntity::text_link(0, 5, "https://open.spotify.com/track/x"),
        ];
        msg.buttons = vec![vec![InlineButton {
            text: "Play".into(),
            url: Some("https://youtu.be/abc".into()),
        }]];

        let candidates = collect_candidates(&msg);
        let values: Vec<&str> = candidates.iter().map(|c| c.raw_value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "check this https://example.com/a",
                "https://open.spotify.com/track/x",
                "https://example.com/a",
                "https://youtu.be/abc",
            ]
        );
        assert_eq!(
            sources(&candidates),
            vec![
                CandidateSource::PlainText,
                CandidateSource::EntityLink,
                CandidateSource::EntityLink,
                CandidateSource::ButtonLink,
            ]
        );
    }

    #[test]
    fn test_bare_entity_sliced_from_original_text() {
        let mut msg = message();
        // The soft hyphen counts toward offsets, so the span must be taken before normalizing.
        msg.caption = Some("\u{00AD}x https://open.spo\u{00AD}tify.com/track/abc".into());
        msg.caption_entities = vec![MessageEntity::bare_url(3, 35)];

        let candidates = CandidateCollector::without_heuristics().collect(&msg);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].source, CandidateSource::CaptionEntityLink);
        assert_eq!(candidates[1].raw_value, "https://open.spotify.com/track/abc");
    }

    #[test]
    fn test_bare_entity_without_scheme_discarded() {
        let mut msg = message();
        msg.text = Some("visit example.com".into());
        msg.entities = vec![MessageEntity::bare_url(6, 11)];
        let candidates = CandidateCollector::without_heuristics().collect(&msg);
        assert_eq!(sources(&candidates), vec![CandidateSource::PlainText]);
    }

    #[test]
    fn test_duplicates_removed() {
        let mut msg = message();
        msg.text = Some("https://youtu.be/abc".into());
        msg.entities = vec![MessageEntity::bare_url(0, 20)];
        msg.buttons = vec![vec![InlineButton {
            text: "again".into(),
            url: Some("https://youtu.be/abc".into()),
        }]];
        let candidates = collect_candidates(&msg);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_button_without_url_ignored() {
        let mut msg = message();
        msg.buttons = vec![vec![
            InlineButton {
                text: "callback".into(),
                url: None,
            },
            InlineButton {
                text: "chat".into(),
                url: Some("tg://resolve?domain=bot".into()),
            },
        ]];
        assert!(CandidateCollector::without_heuristics()
            .collect(&msg)
            .is_empty());
    }

    #[test]
    fn test_heuristics_only_without_direct_urls() {
        let mut msg = message();
        msg.caption = Some("@bot | info 4uLU6hMCjMI75M1A2tKUQC".into());
        let candidates = collect_candidates(&msg);
        assert_eq!(candidates.last().map(|c| c.source), Some(CandidateSource::Reconstructed));

        msg.caption = Some("info 4uLU6hMCjMI75M1A2tKUQC https://youtu.be/dQw4w9WgXcQ".into());
        let candidates = collect_candidates(&msg);
        assert!(candidates
            .iter()
            .all(|c| c.source != CandidateSource::Reconstructed));
    }

    #[test]
    fn test_unrelated_link_does_not_suppress_heuristics() {
        let mut msg = message();
        msg.caption = Some("join https://t.me/x | info 4uLU6hMCjMI75M1A2tKUQC".into());
        let candidates = collect_candidates(&msg);
        let last = candidates.last().unwrap();
        assert_eq!(last.source, CandidateSource::Reconstructed);
        assert_eq!(
            last.raw_value,
            "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"
        );
    }

    #[test]
    fn test_disabled_heuristics_do_not_run() {
        let mut msg = message();
        msg.caption = Some("open . spotify . com / track / 4uLU6hMCjMI75M1A2tKUQC".into());
        let only_base64 = CandidateCollector::new(vec![ReconstructionHeuristic::Base64AfterInfo]);
        assert_eq!(only_base64.collect(&msg).len(), 1);

        let split = CandidateCollector::new(vec![ReconstructionHeuristic::SplitHostname]);
        assert_eq!(split.collect(&msg).len(), 2);
    }
}
