//! Text normalization for obfuscated captions.

/// Invisible code points stripped before any matching.
///
/// Soft hyphen, Mongolian vowel separator, zero-width space/joiners,
/// word joiner, invisible operators (U+2061..U+2064) and the BOM.
pub const SEPARATOR_CHARS: &[char] = &[
    '\u{00AD}', '\u{180E}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{2061}',
    '\u{2062}', '\u{2063}', '\u{2064}', '\u{FEFF}',
];

pub fn is_separator(c: char) -> bool {
    SEPARATOR_CHARS.contains(&c)
}

/// Strip separator characters and collapse whitespace.
///
/// Leading and trailing whitespace is dropped. Idempotent.
pub fn normalize(raw: &str) -> String {
    if !raw.chars().any(is_separator) {
        return collapse_whitespace(raw);
    }
    let stripped: String = raw.chars().filter(|c| !is_separator(*c)).collect();
    collapse_whitespace(&stripped)
}

/// Collapse every whitespace run (including non-breaking variants) to one space.
pub fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
