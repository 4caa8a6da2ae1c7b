//! Post-processing of the final document.
//!
//! Repairs run in a fixed order. A repair that fails leaves the document as
//! it was and the remaining repairs still run.

mod normalize;
mod repairs;

use tracing::warn;

use crate::errors::RepairError;

pub use normalize::{heading_text, normalize_heading, titles_match};
pub use repairs::{
    image_placement, prompt_appendix, sectioning, title, Repair, RepairContext, APPENDIX_HEADING,
    DEFAULT_TITLE, GALLERY_HEADING, OVERVIEW_HEADING, REPAIRS,
};

/// The repaired document and the repairs that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Repaired markdown.
    pub markdown: String,
    /// Repairs that failed and were skipped.
    pub failures: Vec<RepairError>,
}

/// Applies every repair to `doc`.
#[must_use]
pub fn assemble(doc: &str, ctx: &RepairContext<'_>) -> Assembly {
    apply(doc, ctx, &REPAIRS)
}

/// Applies `repairs` in order, keeping the previous text when one fails.
#[must_use]
pub fn apply(doc: &str, ctx: &RepairContext<'_>, repairs: &[(&str, Repair)]) -> Assembly {
    let mut markdown = doc.to_string();
    let mut failures = Vec::new();
    for (name, repair) in repairs {
        match repair(&markdown, ctx) {
            Ok(next) => markdown = next,
            Err(e) => {
                warn!(repair = name, error = %e, "Repair failed, keeping previous text");
                failures.push(e);
            }
        }
    }
    Assembly { markdown, failures }
}
