//! Content types that flow between stages.

mod documents;
mod intent;
mod outline;

pub use documents::{
    fact_check_placeholder, DraftSection, FinalDoc, GeneratedImage, ImagePrompt, Review,
    ReviewIssue, Severity, FACT_CHECK_PLACEHOLDER_NOTE,
};
pub use intent::{Intent, PipelineInput, UploadedFile};
pub use outline::{Outline, OutlineSection, PLACEHOLDER_SECTIONS};
