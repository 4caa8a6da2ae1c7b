//! # Draftflow
//!
//! A long-form document generation pipeline that spreads work across
//! several chat backends.
//!
//! A run takes a writing intent through ten content stages: intent capture,
//! multi-backend outlining, outline merge, section writing, image prompt
//! design, image generation, assembly, expert review, fact checking and a
//! streamed final merge followed by document repairs. Every stage:
//!
//! - **Degrades to a deterministic default** when no backend answers
//! - **Publishes a copy of the run** to an optional progress sink
//! - **Persists a snapshot file** under `runs/` and commits it best-effort
//! - **Honors cancellation** at its boundary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use draftflow::prelude::*;
//!
//! let config = AppConfig::default();
//! let registry = ClientRegistry::from_config(&config);
//! let orchestrator = Orchestrator::new(config, Prompts::default(), registry);
//!
//! let input = PipelineInput::new(Intent::with_topic("Tide pools"));
//! let run = orchestrator.run(input, RunOptions::new()).await?;
//! println!("{}", run.final_doc.unwrap().markdown);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod assembler;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod image;
pub mod llm;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod snapshot;
pub mod streaming;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        AppConfig, ConfigPatch, ConfigStore, FileConfigStore, ImageProvider, InMemoryConfigStore,
        ModelProvider, PromptStore, Prompts, ProviderConfig,
    };
    pub use crate::core::{NodeStatus, RunState, StageKind, StageNode};
    pub use crate::errors::{ChatError, DraftflowError, ImageError};
    pub use crate::events::{
        ChannelProgressSink, CollectingProgressSink, LoggingProgressSink, NoOpProgressSink,
        ProgressSink,
    };
    pub use crate::llm::{ChatClient, ChatRequest, ChatResponse, ClientRegistry};
    pub use crate::model::{
        DraftSection, FinalDoc, GeneratedImage, ImagePrompt, Intent, Outline, OutlineSection,
        PipelineInput, Review, UploadedFile,
    };
    pub use crate::pipeline::{Orchestrator, RunOptions};
    pub use crate::snapshot::{GitVersionControl, NoopVersionControl, VersionControl};
    pub use crate::utils::{generate_id, iso_timestamp, Timestamp};
}
