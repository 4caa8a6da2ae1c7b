//! Testing utilities for draftflow pipelines.
//!
//! This module provides:
//! - A scripted chat client with call recording
//! - Configuration and prompt fixtures

mod fixtures;
mod mocks;

pub use fixtures::{config_with, keyed, offline_config, stage_name_prompts};
pub use mocks::{Reply, ScriptedChatClient};
