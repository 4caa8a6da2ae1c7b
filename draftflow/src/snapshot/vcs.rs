//! Version-control backends for snapshot commits.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::errors::SnapshotError;

/// Commits one snapshot file and reports the resulting revision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Stages `file` (relative to `repo`) and commits it with `message`.
    ///
    /// Returns the short revision, or `None` when the backend keeps no
    /// history.
    async fn commit(
        &self,
        repo: &Path,
        file: &Path,
        message: &str,
    ) -> Result<Option<String>, SnapshotError>;
}

/// Keeps no history.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVersionControl;

#[async_trait]
impl VersionControl for NoopVersionControl {
    async fn commit(
        &self,
        _repo: &Path,
        _file: &Path,
        _message: &str,
    ) -> Result<Option<String>, SnapshotError> {
        Ok(None)
    }
}

/// Shells out to the `git` binary.
#[derive(Debug, Clone)]
pub struct GitVersionControl {
    program: String,
}

impl Default for GitVersionControl {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitVersionControl {
    /// Uses `git` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn git(&self, repo: &Path, args: &[&str]) -> Result<String, SnapshotError> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(repo)
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(SnapshotError::Git(format!(
                "git {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[async_trait]
impl VersionControl for GitVersionControl {
    async fn commit(
        &self,
        repo: &Path,
        file: &Path,
        message: &str,
    ) -> Result<Option<String>, SnapshotError> {
        let file = file.to_string_lossy();
        self.git(repo, &["add", file.as_ref()]).await?;
        self.git(repo, &["commit", "-m", message]).await?;
        let rev = self.git(repo, &["rev-parse", "--short", "HEAD"]).await?;
        Ok((!rev.is_empty()).then_some(rev))
    }
}
