//! Progress sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, Level};

use crate::core::{NodeStatus, RunState};

/// Receives run snapshots as the pipeline advances.
///
/// Every snapshot is an independent copy of the run. Implementations must
/// not fail the run: anything that goes wrong is logged and dropped.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Publishes one snapshot.
    async fn publish(&self, snapshot: RunState);
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn publish(&self, _snapshot: RunState) {}
}

/// Logs a one-line summary of each snapshot.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a sink logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, snapshot: &RunState) {
        let done = snapshot
            .nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Done)
            .count();
        let current = snapshot.nodes.last().map(|n| n.kind.as_str()).unwrap_or("none");
        let final_chars = snapshot.final_doc.as_ref().map_or(0, |d| d.markdown.len());
        if self.level == Level::DEBUG {
            debug!(run_id = %snapshot.id, stage = current, done, final_chars, "Progress");
        } else {
            info!(run_id = %snapshot.id, stage = current, done, final_chars, "Progress");
        }
    }
}

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn publish(&self, snapshot: RunState) {
        self.log(&snapshot);
    }
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    snapshots: RwLock<Vec<RunState>>,
}

impl CollectingProgressSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots received so far.
    #[must_use]
    pub fn snapshots(&self) -> Vec<RunState> {
        self.snapshots.read().clone()
    }

    /// The most recent snapshot.
    #[must_use]
    pub fn last(&self) -> Option<RunState> {
        self.snapshots.read().last().cloned()
    }

    /// Number of snapshots received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }

    /// Final-document lengths across all snapshots that had one.
    #[must_use]
    pub fn final_lengths(&self) -> Vec<usize> {
        self.snapshots
            .read()
            .iter()
            .filter_map(|s| s.final_doc.as_ref().map(|d| d.markdown.len()))
            .collect()
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn publish(&self, snapshot: RunState) {
        self.snapshots.write().push(snapshot);
    }
}

/// Forwards snapshots into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<RunState>,
}

impl ChannelProgressSink {
    /// Creates a sink and the receiver that reads from it.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn publish(&self, snapshot: RunState) {
        if self.tx.send(snapshot).is_err() {
            debug!("Progress receiver dropped");
        }
    }
}
