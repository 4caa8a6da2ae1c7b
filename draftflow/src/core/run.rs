//! Run state: the value the orchestrator owns and publishes.

use serde::{Deserialize, Serialize};

use super::node::StageNode;
use super::status::StageKind;
use crate::model::{DraftSection, FinalDoc, Outline};
use crate::utils::generate_id;

/// The full state of one pipeline run.
///
/// Owned by the orchestrator while running. Progress sinks only ever see
/// clones, so a published snapshot never changes after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Run identifier (UUID v4).
    pub id: String,
    /// Stage nodes in execution order.
    pub nodes: Vec<StageNode>,
    /// The merged outline, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    /// Section drafts, once written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_sections: Option<Vec<DraftSection>>,
    /// The final document. Grows token by token during final-merge.
    #[serde(default, rename = "final", skip_serializing_if = "Option::is_none")]
    pub final_doc: Option<FinalDoc>,
}

impl RunState {
    /// Creates an empty run with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(generate_id())
    }

    /// Creates an empty run with a given id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: Vec::new(),
            outline: None,
            draft_sections: None,
            final_doc: None,
        }
    }

    /// Appends an idle node and returns its index.
    pub fn push_node(&mut self, kind: StageKind) -> usize {
        self.nodes.push(StageNode::new(kind));
        self.nodes.len() - 1
    }

    /// Returns the first node of a kind.
    #[must_use]
    pub fn node(&self, kind: StageKind) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.kind == kind)
    }

    /// Returns the node kinds in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StageKind> {
        self.nodes.iter().map(|n| n.kind).collect()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_has_uuid() {
        let run = RunState::new();
        assert_eq!(run.id.len(), 36);
        assert!(run.nodes.is_empty());
    }

    #[test]
    fn test_push_and_lookup() {
        let mut run = RunState::with_id("r1");
        let idx = run.push_node(StageKind::Intent);
        assert_eq!(idx, 0);
        run.push_node(StageKind::OutlineMulti);
        assert_eq!(run.kinds(), vec![StageKind::Intent, StageKind::OutlineMulti]);
        assert!(run.node(StageKind::OutlineMulti).is_some());
        assert!(run.node(StageKind::Git).is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut run = RunState::with_id("r1");
        run.final_doc = Some(FinalDoc::new("a"));
        let snapshot = run.clone();
        run.final_doc = Some(FinalDoc::new("ab"));
        assert_eq!(snapshot.final_doc.unwrap().markdown, "a");
    }

    #[test]
    fn test_final_doc_serialized_as_final() {
        let mut run = RunState::with_id("r1");
        run.final_doc = Some(FinalDoc::new("# T"));
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["final"]["markdown"], "# T");
    }
}
