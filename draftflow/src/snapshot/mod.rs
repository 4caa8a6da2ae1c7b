//! Stage snapshots on disk with best-effort version control.

mod store;
mod vcs;

pub use store::{SnapshotRecord, SnapshotStore, RUNS_DIR};
pub use vcs::{GitVersionControl, NoopVersionControl, VersionControl};
