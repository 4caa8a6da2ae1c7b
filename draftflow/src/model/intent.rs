//! The run input: the user's intent plus uploaded-file descriptors.

use serde::{Deserialize, Serialize};

/// What the user wants written. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Subject of the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Intended readers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Writing style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Goals the document should meet.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Constraints on the content.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Reference material.
    #[serde(default)]
    pub references: Vec<String>,
}

impl Intent {
    /// Creates an intent with only a topic.
    #[must_use]
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the style.
    #[must_use]
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Returns the topic, or "Untitled" when absent or blank.
    #[must_use]
    pub fn title_or_untitled(&self) -> String {
        match self.topic.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => "Untitled".to_string(),
        }
    }
}

/// Describes a file that was uploaded alongside the intent.
///
/// Only recorded in the intent node; the pipeline never reads the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Original file name.
    pub filename: String,
    /// Where the file was stored.
    pub path: String,
    /// MIME type, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Input to a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// The user's intent.
    pub intent: Intent,
    /// Uploaded-file descriptors.
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

impl PipelineInput {
    /// Creates input from an intent with no files.
    #[must_use]
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            files: Vec::new(),
        }
    }

    /// Attaches file descriptors.
    #[must_use]
    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.files = files;
        self
    }
}
