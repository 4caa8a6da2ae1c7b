//! Per-stage snapshot files under the run directory.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::vcs::VersionControl;
use crate::core::StageKind;
use crate::errors::SnapshotError;
use crate::utils::{iso_timestamp, path_safe};

/// Directory under the root that holds every run.
pub const RUNS_DIR: &str = "runs";

/// One persisted stage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Stage tag, e.g. `03_outline-merge`.
    pub stage: String,
    /// ISO-8601 write time.
    pub when: String,
    /// Stage output.
    pub payload: serde_json::Value,
}

/// Writes snapshot files for one run and commits them best-effort.
pub struct SnapshotStore {
    root: PathBuf,
    run_dir: PathBuf,
    run_id: String,
    vcs: Arc<dyn VersionControl>,
    commits: Mutex<Vec<String>>,
}

impl SnapshotStore {
    /// Creates the store for a run that started at `started_at` (ISO-8601).
    ///
    /// Nothing touches the disk until the first save.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        run_id: impl Into<String>,
        started_at: &str,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        let root = root.into();
        let run_id = run_id.into();
        let run_dir = root
            .join(RUNS_DIR)
            .join(format!("{}_{}", path_safe(started_at), run_id));
        Self {
            root,
            run_dir,
            run_id,
            vcs,
            commits: Mutex::new(Vec::new()),
        }
    }

    /// The run directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Revisions recorded so far, in stage order.
    #[must_use]
    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().clone()
    }

    /// Persists the payload for `stage` and commits it.
    ///
    /// Returns the short revision. Every failure is logged and turns into
    /// `None`; bookkeeping stages are never persisted.
    pub async fn save(&self, stage: StageKind, payload: &serde_json::Value) -> Option<String> {
        let tag = stage.snapshot_tag()?;
        let path = match self.write(tag, payload).await {
            Ok(path) => path,
            Err(e) => {
                warn!(run_id = %self.run_id, stage = tag, error = %e, "Snapshot write failed");
                return None;
            }
        };

        let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_path_buf();
        let message = format!("[run:{}] {}", self.run_id, tag);
        match self.vcs.commit(&self.root, &relative, &message).await {
            Ok(Some(rev)) => {
                debug!(run_id = %self.run_id, stage = tag, rev = %rev, "Snapshot committed");
                self.commits.lock().push(rev.clone());
                Some(rev)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(run_id = %self.run_id, stage = tag, error = %e, "Snapshot commit failed");
                None
            }
        }
    }

    async fn write(&self, tag: &str, payload: &serde_json::Value) -> Result<PathBuf, SnapshotError> {
        tokio::fs::create_dir_all(&self.run_dir).await?;
        let record = SnapshotRecord {
            stage: tag.to_string(),
            when: iso_timestamp(),
            payload: payload.clone(),
        };
        let path = self.run_dir.join(format!("{tag}.json"));
        tokio::fs::write(&path, serde_json::to_string_pretty(&record)?).await?;
        Ok(path)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("run_dir", &self.run_dir)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}
