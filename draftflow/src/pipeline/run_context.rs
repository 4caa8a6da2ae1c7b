//! Mutable state of one run and the per-stage bookkeeping around it.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::core::{RunState, StageKind};
use crate::errors::DraftflowError;
use crate::events::ProgressSink;
use crate::observability::StageTimer;
use crate::snapshot::SnapshotStore;

/// Caller-supplied hooks for one run.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Receives a copy of the run after every stage and every token.
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Checked after every stage.
    pub cancel: Option<Arc<CancellationToken>>,
}

impl RunOptions {
    /// No sink and no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// The run being built plus everything needed to close out a stage.
pub(crate) struct RunContext {
    pub(crate) run: RunState,
    pub(crate) options: RunOptions,
    pub(crate) snapshots: SnapshotStore,
    current: Option<(usize, StageTimer)>,
}

impl RunContext {
    pub(crate) fn new(run: RunState, options: RunOptions, snapshots: SnapshotStore) -> Self {
        Self {
            run,
            options,
            snapshots,
            current: None,
        }
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run.id
    }

    /// Pushes an idle node for `kind` and marks it running.
    pub(crate) fn begin(&mut self, kind: StageKind) -> Result<(), DraftflowError> {
        let index = self.run.push_node(kind);
        self.run.nodes[index].start()?;
        let timer = StageTimer::start(&self.run.id, kind.as_str());
        self.current = Some((index, timer));
        Ok(())
    }

    /// Stores `data` and marks the node done.
    ///
    /// Content stages are then published, snapshotted and followed by a
    /// cancellation check. Bookkeeping nodes only change state; the caller
    /// publishes once after the last of them.
    pub(crate) async fn complete(&mut self, data: Value) -> Result<(), DraftflowError> {
        let Some((index, timer)) = self.current.take() else {
            return Ok(());
        };
        let kind = self.run.nodes[index].kind;
        self.run.nodes[index].data = Some(data);
        self.run.nodes[index].finish()?;
        timer.finish(&self.run.id);

        if kind.is_bookkeeping() {
            return Ok(());
        }
        self.emit().await;
        if let Some(data) = &self.run.nodes[index].data {
            self.snapshots.save(kind, data).await;
        }
        self.checkpoint()
    }

    /// Publishes a copy of the run.
    pub(crate) async fn emit(&self) {
        if let Some(sink) = &self.options.progress {
            sink.publish(self.run.clone()).await;
        }
    }

    fn checkpoint(&self) -> Result<(), DraftflowError> {
        match &self.options.cancel {
            Some(token) => token.checkpoint().map_err(|e| {
                debug!(run_id = %self.run.id, error = %e, "Run cancelled at stage boundary");
                e
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NodeStatus;
    use crate::events::CollectingProgressSink;
    use crate::snapshot::NoopVersionControl;
    use serde_json::json;

    fn context(dir: &std::path::Path, options: RunOptions) -> RunContext {
        let run = RunState::with_id("r1");
        let store = SnapshotStore::new(dir, "r1", "t", Arc::new(NoopVersionControl));
        RunContext::new(run, options, store)
    }

    #[tokio::test]
    async fn test_stage_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(CollectingProgressSink::new());
        let mut ctx = context(dir.path(), RunOptions::new().with_progress(sink.clone()));

        ctx.begin(StageKind::Intent).unwrap();
        assert_eq!(ctx.run.nodes[0].status, NodeStatus::Running);
        ctx.complete(json!({"x": 1})).await.unwrap();

        let node = &ctx.run.nodes[0];
        assert_eq!(node.status, NodeStatus::Done);
        assert!(node.started_at.is_some() && node.ended_at.is_some());
        assert_eq!(sink.len(), 1);
        assert!(ctx.snapshots.run_dir().join("01_intent.json").exists());
    }

    #[tokio::test]
    async fn test_cancel_observed_after_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let token = Arc::new(CancellationToken::new());
        let mut ctx = context(dir.path(), RunOptions::new().with_cancel(token.clone()));

        ctx.begin(StageKind::Intent).unwrap();
        token.cancel("stop");
        let err = ctx.complete(json!({})).await.unwrap_err();
        assert!(err.is_aborted());
        assert!(ctx.snapshots.run_dir().join("01_intent.json").exists());
    }

    #[tokio::test]
    async fn test_bookkeeping_ignores_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let token = Arc::new(CancellationToken::new());
        token.cancel("stop");
        let mut ctx = context(dir.path(), RunOptions::new().with_cancel(token));
        ctx.begin(StageKind::Tts).unwrap();
        ctx.complete(json!({})).await.unwrap();
        assert!(!ctx.snapshots.run_dir().exists());
    }
}
