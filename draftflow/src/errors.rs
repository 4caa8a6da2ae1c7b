//! Error types for the draftflow pipeline.
//!
//! Only [`DraftflowError::Aborted`] is expected to escape a pipeline run. The
//! other enums describe failures that the orchestrator absorbs locally: a
//! failed chat candidate becomes "no result", a failed image job becomes a
//! placeholder image and a failed snapshot becomes "no revision".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::NodeStatus;

/// The main error type for draftflow operations.
#[derive(Debug, Error)]
pub enum DraftflowError {
    /// The run was cancelled at a stage boundary.
    #[error("Pipeline aborted: {0}")]
    Aborted(String),

    /// A stage node was asked to make an illegal status transition.
    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),

    /// Configuration could not be loaded or applied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DraftflowError {
    /// Returns true if this error represents a cancelled run.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// Error raised when a stage node status moves backwards or skips a step.
#[derive(Debug, Clone, Error)]
#[error("Invalid transition for node '{node}': {from} -> {to}")]
pub struct TransitionError {
    /// The node id.
    pub node: String,
    /// The current status.
    pub from: NodeStatus,
    /// The requested status.
    pub to: NodeStatus,
}

impl TransitionError {
    /// Creates a new transition error.
    #[must_use]
    pub fn new(node: impl Into<String>, from: NodeStatus, to: NodeStatus) -> Self {
        Self {
            node: node.into(),
            from,
            to,
        }
    }
}

/// Errors reported by a chat backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The backend has no API key configured.
    #[error("Missing API key")]
    MissingApiKey,

    /// No client is registered for the backend.
    #[error("No client registered for backend: {0}")]
    NoClient(String),

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The (truncated) response body.
        body: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A JSON response was requested but the content did not parse.
    #[error("JSON parse failed: {0}")]
    Parse(String),

    /// The backend returned no usable content.
    #[error("Empty response")]
    EmptyResponse,
}

impl ChatError {
    /// Creates an HTTP error, truncating the body to keep logs readable.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::Http {
            status,
            body: body.chars().take(500).collect(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::MissingApiKey => "MissingApiKey",
            Self::NoClient(_) => "NoClient",
            Self::Http { status, .. } => {
                map.insert("status".to_string(), serde_json::json!(status));
                "Http"
            }
            Self::Transport(_) => "Transport",
            Self::Parse(_) => "Parse",
            Self::EmptyResponse => "EmptyResponse",
        };
        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Failures of the signed image backend. Always recovered with a placeholder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    /// No complete access/secret key pair could be resolved.
    #[error("missing credentials (ak/sk)")]
    MissingCredentials,

    /// The submit response carried no task identifier.
    #[error("no task_id from submit: {0}")]
    MissingTaskId(String),

    /// A non-retryable HTTP status was returned.
    #[error("upstream error ({phase}): HTTP {status}")]
    Http {
        /// "submit" or "get".
        phase: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The task reached a terminal status without an image.
    #[error("terminal status without url: {0}")]
    TerminalStatus(String),

    /// Every poll attempt was used up.
    #[error("no url returned after {0} attempts")]
    Exhausted(usize),
}

/// Failures while persisting a stage snapshot. Always swallowed.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Writing the record failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the record failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The version-control command failed.
    #[error("git error: {0}")]
    Git(String),
}

/// A failed document repair. The assembler keeps the previous text.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("repair '{repair}' failed: {reason}")]
pub struct RepairError {
    /// The repair step name.
    pub repair: String,
    /// Why it failed.
    pub reason: String,
}

impl RepairError {
    /// Creates a new repair error.
    #[must_use]
    pub fn new(repair: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            repair: repair.into(),
            reason: reason.into(),
        }
    }
}
