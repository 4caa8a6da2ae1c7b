//! Heading normalization for image placement.

use unicode_normalization::UnicodeNormalization;

/// NFKC-normalizes `text`, drops whitespace, punctuation and symbols, and
/// lower-cases the rest.
#[must_use]
pub fn normalize_heading(text: &str) -> String {
    text.nfkc()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Heading text without its leading `#` markers.
#[must_use]
pub fn heading_text(line: &str) -> &str {
    line.trim_start_matches('#').trim()
}

/// True when either normalized form contains the other.
///
/// An empty title never matches.
#[must_use]
pub fn titles_match(heading: &str, title: &str) -> bool {
    let title = normalize_heading(title);
    if title.is_empty() {
        return false;
    }
    let heading = normalize_heading(heading_text(heading));
    heading.contains(&title) || title.contains(&heading)
}
