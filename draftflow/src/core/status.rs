//! Stage kind and node status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a stage node represents.
///
/// The first ten kinds are the content stages in execution order. `Git` and
/// `Tts` are bookkeeping nodes appended after the last content stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// Record the user's intent.
    Intent,
    /// Ask several backends for candidate outlines.
    OutlineMulti,
    /// Merge candidate outlines into one.
    OutlineMerge,
    /// Draft every outline section.
    WriteSections,
    /// Compose one image prompt per section.
    ImagePrompts,
    /// Resolve image URLs for the prompts.
    ImageGeneration,
    /// Merge section drafts into one document.
    MergeAssembly,
    /// Review the merged document.
    ExpertReview,
    /// Fact-check the merged document.
    FactCheck,
    /// Produce and repair the final document.
    FinalMerge,
    /// Snapshot commit aggregation.
    Git,
    /// Narration marker.
    Tts,
}

impl StageKind {
    /// The ten content stages in execution order.
    pub const CONTENT: [Self; 10] = [
        Self::Intent,
        Self::OutlineMulti,
        Self::OutlineMerge,
        Self::WriteSections,
        Self::ImagePrompts,
        Self::ImageGeneration,
        Self::MergeAssembly,
        Self::ExpertReview,
        Self::FactCheck,
        Self::FinalMerge,
    ];

    /// Returns the kebab-case name used in configuration and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::OutlineMulti => "outline-multi",
            Self::OutlineMerge => "outline-merge",
            Self::WriteSections => "write-sections",
            Self::ImagePrompts => "image-prompts",
            Self::ImageGeneration => "image-generation",
            Self::MergeAssembly => "merge-assembly",
            Self::ExpertReview => "expert-review",
            Self::FactCheck => "fact-check",
            Self::FinalMerge => "final-merge",
            Self::Git => "git",
            Self::Tts => "tts",
        }
    }

    /// Returns the snapshot file tag for content stages.
    #[must_use]
    pub const fn snapshot_tag(&self) -> Option<&'static str> {
        match self {
            Self::Intent => Some("01_intent"),
            Self::OutlineMulti => Some("02_outline-multi"),
            Self::OutlineMerge => Some("03_outline-merge"),
            Self::WriteSections => Some("04_write-sections"),
            Self::ImagePrompts => Some("04b_image-prompts"),
            Self::ImageGeneration => Some("04c_image-generation"),
            Self::MergeAssembly => Some("05_merge-assembly"),
            Self::ExpertReview => Some("06_expert-review"),
            Self::FactCheck => Some("07_fact-check"),
            Self::FinalMerge => Some("08_final-merge"),
            Self::Git | Self::Tts => None,
        }
    }

    /// Returns true for the bookkeeping kinds.
    #[must_use]
    pub const fn is_bookkeeping(&self) -> bool {
        matches!(self, Self::Git | Self::Tts)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle status of a stage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Created, not started.
    Idle,
    /// Currently executing.
    Running,
    /// Completed.
    Done,
    /// Failed.
    Error,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl NodeStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns true if `next` is a legal successor of this status.
    ///
    /// Legal moves are idle -> running and running -> done | error.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running) | (Self::Running, Self::Done | Self::Error)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Intent.to_string(), "intent");
        assert_eq!(StageKind::OutlineMulti.to_string(), "outline-multi");
        assert_eq!(StageKind::ImageGeneration.to_string(), "image-generation");
        assert_eq!(StageKind::Git.to_string(), "git");
    }

    #[test]
    fn test_stage_kind_serialize_kebab_case() {
        let json = serde_json::to_string(&StageKind::WriteSections).unwrap();
        assert_eq!(json, r#""write-sections""#);

        let kind: StageKind = serde_json::from_str(r#""final-merge""#).unwrap();
        assert_eq!(kind, StageKind::FinalMerge);
    }

    #[test]
    fn test_content_order_and_tags() {
        let tags: Vec<_> = StageKind::CONTENT
            .iter()
            .filter_map(StageKind::snapshot_tag)
            .collect();
        assert_eq!(
            tags,
            vec![
                "01_intent",
                "02_outline-multi",
                "03_outline-merge",
                "04_write-sections",
                "04b_image-prompts",
                "04c_image-generation",
                "05_merge-assembly",
                "06_expert-review",
                "07_fact-check",
                "08_final-merge",
            ]
        );
        assert!(StageKind::Git.snapshot_tag().is_none());
        assert!(StageKind::Tts.is_bookkeeping());
    }

    #[test]
    fn test_node_status_transitions() {
        assert!(NodeStatus::Idle.can_transition_to(NodeStatus::Running));
        assert!(NodeStatus::Running.can_transition_to(NodeStatus::Done));
        assert!(NodeStatus::Running.can_transition_to(NodeStatus::Error));
        assert!(!NodeStatus::Idle.can_transition_to(NodeStatus::Done));
        assert!(!NodeStatus::Done.can_transition_to(NodeStatus::Running));
        assert!(!NodeStatus::Error.can_transition_to(NodeStatus::Idle));
    }

    #[test]
    fn test_node_status_serialize() {
        let json = serde_json::to_string(&NodeStatus::Running).unwrap();
        assert_eq!(json, r#""running""#);
        assert!(NodeStatus::Done.is_terminal());
        assert!(!NodeStatus::Idle.is_terminal());
    }
}
