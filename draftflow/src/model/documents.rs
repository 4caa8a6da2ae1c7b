//! Drafts, images, review and final document types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Markdown drafted for one outline section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    /// The outline section this draft belongs to.
    pub section_id: String,
    /// Draft body.
    pub markdown: String,
}

impl DraftSection {
    /// Creates a draft.
    #[must_use]
    pub fn new(section_id: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            markdown: markdown.into(),
        }
    }

    /// The draft used when no backend produced one.
    #[must_use]
    pub fn placeholder(section_id: impl Into<String>, title: &str) -> Self {
        Self::new(section_id, format!("# {title}\n\nPlaceholder content."))
    }
}

/// A text-to-image prompt for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompt {
    /// The outline section.
    #[serde(default)]
    pub section_id: String,
    /// Caption.
    #[serde(default)]
    pub title: String,
    /// Prompt text.
    pub prompt: String,
}

impl ImagePrompt {
    /// Creates a prompt.
    #[must_use]
    pub fn new(
        section_id: impl Into<String>,
        title: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            title: title.into(),
            prompt: prompt.into(),
        }
    }

    /// Attaches a resolved URL.
    #[must_use]
    pub fn into_image(self, url: impl Into<String>) -> GeneratedImage {
        GeneratedImage {
            section_id: self.section_id,
            title: self.title,
            prompt: self.prompt,
            url: url.into(),
        }
    }
}

/// An image prompt with its resolved URL (remote, base64 or placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// The outline section.
    pub section_id: String,
    /// Caption.
    pub title: String,
    /// Prompt text.
    pub prompt: String,
    /// Resolved image URL.
    pub url: String,
}

/// Review issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor.
    Low,
    /// Should be fixed.
    Medium,
    /// Must be fixed.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One reviewer finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewIssue {
    /// Where in the document the issue is.
    pub location_id: String,
    /// How serious it is.
    pub severity: Severity,
    /// Suggested change.
    pub suggestion: String,
    /// Why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Expert review output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Findings, possibly empty.
    pub issues: Vec<ReviewIssue>,
}

impl Review {
    /// Parses a backend JSON value; `None` when it does not match the shape.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Placeholder note recorded when no fact-check backend answered.
pub const FACT_CHECK_PLACEHOLDER_NOTE: &str = "Placeholder: online fact-check not enabled";

/// The fact-check result used when no backend answered.
#[must_use]
pub fn fact_check_placeholder() -> serde_json::Value {
    serde_json::json!({
        "verified": false,
        "notes": [FACT_CHECK_PLACEHOLDER_NOTE],
    })
}

/// A markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDoc {
    /// Document body.
    pub markdown: String,
}

impl FinalDoc {
    /// Creates a document.
    #[must_use]
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }
}
