//! Outline types and the placeholder outline.

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::generate_id;

/// Number of sections in the placeholder outline.
pub const PLACEHOLDER_SECTIONS: usize = 5;

/// One section of an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    /// Section identifier. Synthesized when a backend omits it.
    #[serde(default = "generate_id", deserialize_with = "lenient_id")]
    pub id: String,
    /// Section title.
    #[serde(default)]
    pub title: String,
    /// Goals for the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    /// Key points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullets: Option<Vec<String>>,
    /// Whether claims in this section need sources.
    #[serde(
        default,
        alias = "requires_evidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_evidence: Option<bool>,
}

impl OutlineSection {
    /// Creates a section with a fresh id.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            title: title.into(),
            goals: None,
            bullets: None,
            requires_evidence: None,
        }
    }

    /// Overrides the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the bullets.
    #[must_use]
    pub fn with_bullets<I, S>(mut self, bullets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bullets = Some(bullets.into_iter().map(Into::into).collect());
        self
    }
}

/// Accepts string or numeric ids; null falls back to a fresh UUID.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.is_empty() => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => generate_id(),
    })
}

/// A document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Ordered sections.
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Creates an outline.
    #[must_use]
    pub fn new(title: impl Into<String>, sections: Vec<OutlineSection>) -> Self {
        Self {
            title: title.into(),
            sections,
        }
    }

    /// The placeholder outline: five sections "Section 1".."Section 5", each
    /// with bullets "Point A" and "Point B".
    #[must_use]
    pub fn placeholder(title: impl Into<String>) -> Self {
        let sections = (1..=PLACEHOLDER_SECTIONS)
            .map(|i| OutlineSection::new(format!("Section {i}")).with_bullets(["Point A", "Point B"]))
            .collect();
        Self::new(title, sections)
    }

    /// An outline is usable only with at least one section.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.sections.is_empty()
    }

    /// Parses a backend JSON value, returning `None` unless well formed.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value::<Self>(value.clone())
            .ok()
            .filter(Self::is_well_formed)
    }

    /// Looks up a section title by id.
    #[must_use]
    pub fn section_title(&self, id: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.title.as_str())
    }
}
