//! Configuration and prompt-template stores.
//!
//! A run captures one [`AppConfig`] and one [`Prompts`] value when the
//! orchestrator is built. Later changes to a store do not affect runs that
//! are already executing.

mod app;
mod prompts;
mod store;

pub use app::{
    AppConfig, ConfigPatch, ImageProvider, ImageStageProviders, ModelProvider, ProviderConfig,
    StageProviders,
};
pub use prompts::{InMemoryPromptStore, PromptStore, Prompts, PROMPT_KEYS};
pub use store::{load_from, ConfigStore, FileConfigStore, InMemoryConfigStore, CONFIG_FILE_NAME};
