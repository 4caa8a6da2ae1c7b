//! Configuration stores.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::app::{AppConfig, ConfigPatch};

/// Name of the persisted configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Source of the configuration snapshot a run is built from.
pub trait ConfigStore: Send + Sync {
    /// Returns the current configuration.
    fn get_config(&self) -> AppConfig;

    /// Merges a patch (last write wins) and returns the new configuration.
    fn set_config(&self, patch: ConfigPatch) -> AppConfig;
}

/// A process-local configuration store.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    config: RwLock<AppConfig>,
}

impl InMemoryConfigStore {
    /// Creates a store seeded with `config`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get_config(&self) -> AppConfig {
        self.config.read().clone()
    }

    fn set_config(&self, patch: ConfigPatch) -> AppConfig {
        let mut guard = self.config.write();
        guard.apply(patch);
        guard.clone()
    }
}

/// A store persisted as `<data dir>/config.json`.
///
/// The file is read once at open time and merged over the defaults. Every
/// `set_config` rewrites it; write failures are logged and ignored.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    inner: InMemoryConfigStore,
}

impl FileConfigStore {
    /// Opens the store in `data_dir`, falling back to defaults when the file
    /// is missing or unreadable.
    #[must_use]
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(CONFIG_FILE_NAME);
        let config = load_from(&path).unwrap_or_default();
        Self {
            path,
            inner: InMemoryConfigStore::new(config),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, config: &AppConfig) {
        let result = (|| -> std::io::Result<()> {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let body = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
            std::fs::write(&self.path, body)
        })();
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to persist config");
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn get_config(&self) -> AppConfig {
        self.inner.get_config()
    }

    fn set_config(&self, patch: ConfigPatch) -> AppConfig {
        let config = self.inner.set_config(patch);
        self.save(&config);
        config
    }
}

/// Reads a partial config file and merges it over the defaults.
///
/// Returns `None` when the file does not exist or does not parse.
#[must_use]
pub fn load_from(path: &Path) -> Option<AppConfig> {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No config file, using defaults");
            return None;
        }
    };
    match serde_json::from_str::<ConfigPatch>(&body) {
        Ok(patch) => Some(AppConfig::default().merged(patch)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::app::{ModelProvider, ProviderConfig};
    use std::collections::BTreeMap;

    fn enable_openai() -> ConfigPatch {
        ConfigPatch {
            providers: Some(BTreeMap::from([(
                ModelProvider::Openai,
                ProviderConfig::new(true, "gpt-4o"),
            )])),
            ..ConfigPatch::default()
        }
    }

    #[test]
    fn test_in_memory_last_write_wins() {
        let store = InMemoryConfigStore::default();
        store.set_config(ConfigPatch {
            concurrency: Some(5),
            ..ConfigPatch::default()
        });
        let config = store.set_config(ConfigPatch {
            concurrency: Some(1),
            ..ConfigPatch::default()
        });
        assert_eq!(config.concurrency, 1);
        assert_eq!(store.get_config().concurrency, 1);
    }

    #[test]
    fn test_file_store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::open(dir.path());
        assert_eq!(store.get_config(), AppConfig::default());

        store.set_config(enable_openai());
        assert!(store.path().exists());

        let reopened = FileConfigStore::open(dir.path());
        let config = reopened.get_config();
        assert!(config.providers[&ModelProvider::Openai].enabled);
        assert!(config.providers[&ModelProvider::Qwen].enabled);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"stageProviders":{"final-merge":["kimi"]}}"#,
        )
        .unwrap();
        let config = FileConfigStore::open(dir.path()).get_config();
        assert_eq!(
            config.stage_providers[&crate::core::StageKind::FinalMerge],
            vec![ModelProvider::Kimi]
        );
        assert_eq!(config.providers.len(), 7);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").unwrap();
        assert_eq!(FileConfigStore::open(dir.path()).get_config(), AppConfig::default());
    }
}
