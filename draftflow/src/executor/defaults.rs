//! Deterministic stand-ins used when no backend produced a result.

use crate::model::{DraftSection, Outline, PLACEHOLDER_SECTIONS};

/// How many placeholder outlines stand in for an empty fan-out.
pub const PLACEHOLDER_OUTLINE_COUNT: usize = 3;

/// Suffix appended to the merged document when final merge yields nothing.
pub const FINAL_PLACEHOLDER_SUFFIX: &str = "\n\n(final draft placeholder)";

/// Three identical placeholder outlines titled `title`.
#[must_use]
pub fn placeholder_outlines(title: &str) -> Vec<Outline> {
    vec![Outline::placeholder(title); PLACEHOLDER_OUTLINE_COUNT]
}

/// Merges candidates without a backend.
///
/// Sections of all candidates are concatenated and the first five kept. The
/// title comes from the first candidate, or `fallback_title` when there are
/// none. An empty result becomes the placeholder outline.
#[must_use]
pub fn merge_outlines(candidates: &[Outline], fallback_title: &str) -> Outline {
    let title = candidates
        .first()
        .map_or(fallback_title, |c| c.title.as_str())
        .to_string();
    let sections: Vec<_> = candidates
        .iter()
        .flat_map(|c| c.sections.iter().cloned())
        .take(PLACEHOLDER_SECTIONS)
        .collect();
    if sections.is_empty() {
        Outline::placeholder(title)
    } else {
        Outline::new(title, sections)
    }
}

/// Joins drafts with blank lines.
#[must_use]
pub fn assemble_drafts(drafts: &[DraftSection]) -> String {
    drafts
        .iter()
        .map(|d| d.markdown.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The final document used when no backend produced one.
#[must_use]
pub fn final_placeholder(merged: &str) -> String {
    format!("{merged}{FINAL_PLACEHOLDER_SUFFIX}")
}
