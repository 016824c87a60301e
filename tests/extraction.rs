//! End-to-end track extraction over whole messages.

use chrono::Utc;

use trackdex::extract::{collapse_whitespace, collect_candidates, extract_track, normalize};
use trackdex::models::{
    Candidate, CandidateSource, FileInfo, InlineButton, Media, Message, MessageEntity, Platform,
};

fn message(text: Option<&str>, caption: Option<&str>) -> Message {
    let mut msg = Message::new(-100123, 42, Utc::now());
    msg.text = text.map(str::to_string);
    msg.caption = caption.map(str::to_string);
    msg
}

#[test]
fn normalize_is_idempotent() {
    let inputs = [
        "",
        "   ",
        "plain text",
        "  padded \t\n text  ",
        "https://open.spo\u{00AD}tify.com/track/x",
        "a\u{200B}\u{200C}\u{200D}b \u{2060} c\u{FEFF}",
        "info\u{2063}https://youtu.be/dQw4w9WgXcQ",
        "emoji 🎵 and ünïcödé",
    ];
    for input in inputs {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
    }
}

#[test]
fn normalize_matches_collapse_without_separators() {
    let inputs = [
        "one  two   three",
        "\ttabs\tand\nnewlines\n",
        "already clean",
        "  leading and trailing  ",
    ];
    for input in inputs {
        assert_eq!(normalize(input), collapse_whitespace(input));
    }
}

#[test]
fn single_spotify_candidate() {
    let url = "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC";
    let track = extract_track(&[Candidate::text(url)]).unwrap();
    assert_eq!(track.platform, Platform::Spotify);
    assert_eq!(track.track_id, "4uLU6hMCjMI75M1A2tKUQC");
    assert_eq!(track.canonical_url, url);
}

#[test]
fn soft_hyphen_inside_host_is_removed() {
    let candidate = Candidate::text("https://open.spo\u{00AD}tify.com/track/7qiZfU4dY1lWllzX7mkmht");
    let track = extract_track(&[candidate]).unwrap();
    assert_eq!(track.track_id, "7qiZfU4dY1lWllzX7mkmht");
    assert_eq!(
        track.canonical_url,
        "https://open.spotify.com/track/7qiZfU4dY1lWllzX7mkmht"
    );
}

#[test]
fn text_without_url_yields_nothing() {
    assert!(extract_track(&[Candidate::text("@bot | info\u{00AD}")]).is_none());
    assert!(extract_track(&[]).is_none());
}

#[test]
fn non_matching_candidates_are_skipped() {
    let candidates = [
        Candidate::text("https://example.com/not-a-track"),
        Candidate::text("https://open.spotify.com/track/ABCDEFGHIJKLMNOPQRSTUV"),
    ];
    let track = extract_track(&candidates).unwrap();
    assert_eq!(track.platform, Platform::Spotify);
    assert_eq!(track.track_id, "ABCDEFGHIJKLMNOPQRSTUV");
}

#[test]
fn hidden_text_link_is_found() {
    let mut msg = message(None, Some("Listen here"));
    msg.caption_entities = vec![MessageEntity::text_link(
        7,
        4,
        "https://www.jiosaavn.com/song/tum-hi-ho/EToxUyFpcwQ",
    )];
    msg.media = Some(Media::Audio(FileInfo {
        file_id: "AQAD1".into(),
        file_unique_id: "u1".into(),
        ..Default::default()
    }));

    let candidates = collect_candidates(&msg);
    assert!(candidates
        .iter()
        .any(|c| c.source == CandidateSource::CaptionEntityLink));

    let track = extract_track(&candidates).unwrap();
    assert_eq!(track.platform, Platform::Jiosaavn);
    assert_eq!(track.track_id, "EToxUyFpcwQ");
}

#[test]
fn bare_url_entity_uses_utf16_offsets() {
    // The emoji takes two UTF-16 units.
    let text = "🎵 https://youtu.be/dQw4w9WgXcQ";
    let mut msg = message(Some(text), None);
    msg.entities = vec![MessageEntity::bare_url(3, 28)];

    let candidates = collect_candidates(&msg);
    assert!(candidates.iter().any(|c| c.source == CandidateSource::EntityLink
        && c.raw_value == "https://youtu.be/dQw4w9WgXcQ"));

    let track = extract_track(&candidates).unwrap();
    assert_eq!(track.platform, Platform::YoutubeShort);
    assert_eq!(track.track_id, "dQw4w9WgXcQ");
}

#[test]
fn button_link_is_a_candidate() {
    let mut msg = message(Some("New drop"), None);
    msg.buttons = vec![vec![InlineButton {
        text: "Play".into(),
        url: Some("https://music.apple.com/us/album/x/1440857781?i=1440857786".into()),
    }]];

    let candidates = collect_candidates(&msg);
    assert_eq!(candidates.last().unwrap().source, CandidateSource::ButtonLink);

    let track = extract_track(&candidates).unwrap();
    assert_eq!(track.platform, Platform::AppleMusic);
}

#[test]
fn base64_payload_after_info_is_reconstructed() {
    let msg = message(
        None,
        Some("@bot | info aHR0cHM6Ly9vcGVuLnNwb3RpZnkuY29tL3RyYWNrLzR1TFU2aE1Dak1JNzVNMUEydEtVUUM="),
    );

    let candidates = collect_candidates(&msg);
    assert!(candidates
        .iter()
        .any(|c| c.source == CandidateSource::Reconstructed));

    let track = extract_track(&candidates).unwrap();
    assert_eq!(track.track_id, "4uLU6hMCjMI75M1A2tKUQC");
}

#[test]
fn heuristics_do_not_run_when_a_platform_url_exists() {
    let msg = message(
        Some("https://youtu.be/dQw4w9WgXcQ info 4uLU6hMCjMI75M1A2tKUQC"),
        None,
    );

    let candidates = collect_candidates(&msg);
    assert!(candidates
        .iter()
        .all(|c| c.source != CandidateSource::Reconstructed));
    let track = extract_track(&candidates).unwrap();
    assert_eq!(track.platform, Platform::YoutubeShort);
}

#[test]
fn promo_link_does_not_hide_reconstructed_id() {
    let msg = message(
        None,
        Some("Join https://t.me/x for more | info 4uLU6hMCjMI75M1A2tKUQC"),
    );

    let track = extract_track(&collect_candidates(&msg)).unwrap();
    assert_eq!(track.platform, Platform::Spotify);
    assert_eq!(track.track_id, "4uLU6hMCjMI75M1A2tKUQC");
}

#[test]
fn separator_between_label_and_url_does_not_hide_it() {
    let msg = message(
        Some("info\u{2063}https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
        None,
    );
    let track = extract_track(&collect_candidates(&msg)).unwrap();
    assert_eq!(track.track_id, "4uLU6hMCjMI75M1A2tKUQC");
}
