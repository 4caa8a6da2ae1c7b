//! Stage node: one entry in the run's progress list.

use serde::{Deserialize, Serialize};

use super::status::{NodeStatus, StageKind};
use crate::errors::TransitionError;
use crate::utils::now_millis;

/// The record of one stage in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageNode {
    /// Node identifier (the stage name).
    pub id: String,
    /// Stage kind.
    #[serde(rename = "type")]
    pub kind: StageKind,
    /// Lifecycle status.
    pub status: NodeStatus,
    /// Unix millis when the node started running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    /// Unix millis when the node finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    /// Stage-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StageNode {
    /// Creates an idle node for a stage kind.
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self {
            id: kind.as_str().to_string(),
            kind,
            status: NodeStatus::Idle,
            started_at: None,
            ended_at: None,
            data: None,
        }
    }

    /// Moves the node to `next`, stamping start/end times.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] and leaves the node unchanged when the
    /// move is not idle -> running or running -> done | error.
    pub fn transition(&mut self, next: NodeStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::new(&self.id, self.status, next));
        }
        match next {
            NodeStatus::Running => self.started_at = Some(now_millis()),
            NodeStatus::Done | NodeStatus::Error => self.ended_at = Some(now_millis()),
            NodeStatus::Idle => {}
        }
        self.status = next;
        Ok(())
    }

    /// Shorthand for `transition(Running)`.
    ///
    /// # Errors
    ///
    /// See [`StageNode::transition`].
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(NodeStatus::Running)
    }

    /// Shorthand for `transition(Done)`.
    ///
    /// # Errors
    ///
    /// See [`StageNode::transition`].
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        self.transition(NodeStatus::Done)
    }

    /// Wall time between start and end, when both are set.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        Some(self.ended_at? - self.started_at?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_idle() {
        let node = StageNode::new(StageKind::OutlineMerge);
        assert_eq!(node.id, "outline-merge");
        assert_eq!(node.status, NodeStatus::Idle);
        assert!(node.started_at.is_none());
    }

    #[test]
    fn test_lifecycle_stamps_times() {
        let mut node = StageNode::new(StageKind::Intent);
        node.start().unwrap();
        assert!(node.started_at.is_some());
        node.finish().unwrap();
        assert_eq!(node.status, NodeStatus::Done);
        assert!(node.duration_ms().unwrap() >= 0);
    }

    #[test]
    fn test_illegal_transition_leaves_node_unchanged() {
        let mut node = StageNode::new(StageKind::Intent);
        let before = node.clone();
        assert!(node.finish().is_err());
        assert_eq!(node, before);

        node.start().unwrap();
        node.finish().unwrap();
        let done = node.clone();
        assert!(node.start().is_err());
        assert_eq!(node, done);
    }

    #[test]
    fn test_serialize_uses_type_key() {
        let node = StageNode::new(StageKind::FactCheck);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "fact-check");
        assert_eq!(value["status"], "idle");
        assert!(value.get("startedAt").is_none());
    }
}
