//! Core run model: stage kinds, node lifecycle and the run state.

mod node;
mod run;
mod status;

pub use node::StageNode;
pub use run::RunState;
pub use status::{NodeStatus, StageKind};
