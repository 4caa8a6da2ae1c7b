//! The document pipeline.
//!
//! Stages run strictly in sequence on the caller's task. Each stage pushes
//! its node, does its work, publishes a snapshot of the run, writes its
//! snapshot file and then checks for cancellation.

mod orchestrator;
mod run_context;
mod stages;

pub use orchestrator::Orchestrator;
pub use run_context::RunOptions;
pub use stages::compose_image_prompt;

mod integration_tests;
