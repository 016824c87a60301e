//! Track-link extraction from message text.
//!
//! The pipeline has three stages that can also be used on their own:
//!
//! 1. [`normalize`] strips invisible separator characters and collapses whitespace.
//! 2. [`CandidateCollector`] gathers every URL-bearing fragment of a message in
//!    trust order: text, link entities, caption entities, buttons, and finally
//!    best-effort reconstructions.
//! 3. [`extract_track`] runs the candidates against the platform table and
//!    returns the first match.

mod candidates;
mod heuristics;
mod normalize;
mod patterns;

pub use candidates::{collect_candidates, CandidateCollector};
pub use heuristics::ReconstructionHeuristic;
pub use normalize::{collapse_whitespace, is_separator, normalize, SEPARATOR_CHARS};
pub use patterns::{contains_url, extract_track, find_urls, match_url};

use crate::models::{Message, TrackMatch};

/// Collect and extract in one step with the given collector.
pub fn extract_from_message(collector: &CandidateCollector, message: &Message) -> Option<TrackMatch> {
    extract_track(&collector.collect(message))
}
