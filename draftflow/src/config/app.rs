//! Application configuration: backends, stage mappings and limits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::StageKind;

/// A text-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Moonshot Kimi.
    Kimi,
    /// Alibaba Qwen.
    Qwen,
    /// Zhipu GLM.
    Glm,
    /// DeepSeek.
    Deepseek,
    /// OpenAI.
    Openai,
    /// Anthropic.
    Anthropic,
    /// Google Gemini.
    Gemini,
}

impl ModelProvider {
    /// All text backends in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Kimi,
        Self::Qwen,
        Self::Glm,
        Self::Deepseek,
        Self::Openai,
        Self::Anthropic,
        Self::Gemini,
    ];

    /// Lower-case identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Kimi => "kimi",
            Self::Qwen => "qwen",
            Self::Glm => "glm",
            Self::Deepseek => "deepseek",
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    /// Kling.
    Keling,
    /// Paiwo.
    Paiwo,
    /// Volcengine Jimeng, the only backend with a real adapter.
    Jimeng,
    /// Nano Banana.
    Nanobanana,
}

impl ImageProvider {
    /// All image backends in declaration order.
    pub const ALL: [Self; 4] = [Self::Keling, Self::Paiwo, Self::Jimeng, Self::Nanobanana];

    /// Lower-case identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Keling => "keling",
            Self::Paiwo => "paiwo",
            Self::Jimeng => "jimeng",
            Self::Nanobanana => "nanobanana",
        }
    }
}

impl fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Whether the backend may be selected.
    #[serde(default)]
    pub enabled: bool,
    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name sent with each request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Whether the backend should use its web search tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_web_search: Option<bool>,
    /// Base URL override for the HTTP client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Access key (signed image backends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ak: Option<String>,
    /// Secret key (signed image backends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk: Option<String>,
}

impl ProviderConfig {
    /// Creates an enabled or disabled entry with a model.
    #[must_use]
    pub fn new(enabled: bool, model: impl Into<String>) -> Self {
        Self {
            enabled,
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the access/secret key pair.
    #[must_use]
    pub fn with_keys(mut self, ak: impl Into<String>, sk: impl Into<String>) -> Self {
        self.ak = Some(ak.into());
        self.sk = Some(sk.into());
        self
    }

    /// Returns the API key when it is non-blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Per-stage text backend lists.
pub type StageProviders = BTreeMap<StageKind, Vec<ModelProvider>>;

/// Per-stage image backend lists.
pub type ImageStageProviders = BTreeMap<StageKind, Vec<ImageProvider>>;

/// The full configuration snapshot a run is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Text backends.
    pub providers: BTreeMap<ModelProvider, ProviderConfig>,
    /// Image backends.
    pub image_providers: BTreeMap<ImageProvider, ProviderConfig>,
    /// Requested parallelism. The per-backend limiter caps it at 2.
    pub concurrency: usize,
    /// Spending ceiling in USD. Informational.
    #[serde(rename = "budgetUSD", alias = "budgetUsd")]
    pub budget_usd: f64,
    /// Narration backend name. Informational.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_provider: Option<String>,
    /// Text backends per stage, in fallback order.
    pub stage_providers: StageProviders,
    /// Image backends per stage.
    pub image_stage_providers: ImageStageProviders,
}

impl Default for AppConfig {
    fn default() -> Self {
        use ModelProvider::{Anthropic, Deepseek, Gemini, Glm, Kimi, Openai, Qwen};

        let providers = BTreeMap::from([
            (Kimi, ProviderConfig {
                use_web_search: Some(true),
                ..ProviderConfig::new(true, "kimi-k2-0711-preview")
            }),
            (Qwen, ProviderConfig::new(true, "qwen2.5-72b-instruct")),
            (Glm, ProviderConfig::new(false, "glm-4.5")),
            (Deepseek, ProviderConfig::new(false, "deepseek-chat")),
            (Openai, ProviderConfig::new(false, "gpt-4o-mini")),
            (Anthropic, ProviderConfig::new(false, "claude-3-5-sonnet")),
            (Gemini, ProviderConfig::new(false, "gemini-1.5-pro")),
        ]);

        let image_providers = BTreeMap::from([
            (ImageProvider::Keling, ProviderConfig::new(false, "kling-image-v1")),
            (ImageProvider::Paiwo, ProviderConfig::new(false, "paiwo-image-v1")),
            (ImageProvider::Jimeng, ProviderConfig::new(false, "jimeng-image-v1")),
            (ImageProvider::Nanobanana, ProviderConfig::new(false, "nanobanana-image-v1")),
        ]);

        let stage_providers = BTreeMap::from([
            (StageKind::Intent, vec![Kimi]),
            (StageKind::OutlineMulti, ModelProvider::ALL.to_vec()),
            (StageKind::OutlineMerge, vec![Qwen]),
            (
                StageKind::WriteSections,
                vec![Qwen, Deepseek, Openai, Anthropic, Gemini, Kimi, Glm],
            ),
            (StageKind::ImagePrompts, vec![]),
            (StageKind::ImageGeneration, vec![]),
            (StageKind::MergeAssembly, vec![Qwen]),
            (StageKind::ExpertReview, vec![Qwen, Openai, Anthropic, Gemini]),
            (StageKind::FactCheck, vec![Kimi]),
            (StageKind::FinalMerge, vec![Qwen]),
        ]);

        Self {
            providers,
            image_providers,
            concurrency: 3,
            budget_usd: 1.0,
            tts_provider: Some("web".to_string()),
            stage_providers,
            image_stage_providers: BTreeMap::from([(StageKind::ImageGeneration, vec![])]),
        }
    }
}

impl AppConfig {
    /// Configuration with every backend disabled and no stage mappings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: BTreeMap::new(),
            image_providers: BTreeMap::new(),
            concurrency: 1,
            budget_usd: 0.0,
            tts_provider: None,
            stage_providers: BTreeMap::new(),
            image_stage_providers: BTreeMap::new(),
        }
    }

    /// Sets a text backend entry.
    #[must_use]
    pub fn with_provider(mut self, provider: ModelProvider, config: ProviderConfig) -> Self {
        self.providers.insert(provider, config);
        self
    }

    /// Sets an image backend entry.
    #[must_use]
    pub fn with_image_provider(mut self, provider: ImageProvider, config: ProviderConfig) -> Self {
        self.image_providers.insert(provider, config);
        self
    }

    /// Sets the text backends for a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageKind, providers: Vec<ModelProvider>) -> Self {
        self.stage_providers.insert(stage, providers);
        self
    }

    /// Sets the image backends for a stage.
    #[must_use]
    pub fn with_image_stage(mut self, stage: StageKind, providers: Vec<ImageProvider>) -> Self {
        self.image_stage_providers.insert(stage, providers);
        self
    }

    /// Sets the requested concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Model name configured for a backend, empty when unset.
    #[must_use]
    pub fn model_of(&self, provider: ModelProvider) -> String {
        self.providers
            .get(&provider)
            .and_then(|p| p.model.clone())
            .unwrap_or_default()
    }

    /// Applies a patch: scalars replace, maps merge key by key.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(providers) = patch.providers {
            self.providers.extend(providers);
        }
        if let Some(image_providers) = patch.image_providers {
            self.image_providers.extend(image_providers);
        }
        if let Some(concurrency) = patch.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(budget) = patch.budget_usd {
            self.budget_usd = budget;
        }
        if let Some(tts) = patch.tts_provider {
            self.tts_provider = Some(tts);
        }
        if let Some(stages) = patch.stage_providers {
            self.stage_providers.extend(stages);
        }
        if let Some(stages) = patch.image_stage_providers {
            self.image_stage_providers.extend(stages);
        }
    }

    /// Returns a copy with the patch applied.
    #[must_use]
    pub fn merged(mut self, patch: ConfigPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// A partial configuration. Absent fields leave the target untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    /// Text backend entries to replace.
    pub providers: Option<BTreeMap<ModelProvider, ProviderConfig>>,
    /// Image backend entries to replace.
    pub image_providers: Option<BTreeMap<ImageProvider, ProviderConfig>>,
    /// New concurrency.
    pub concurrency: Option<usize>,
    /// New budget.
    #[serde(rename = "budgetUSD", alias = "budgetUsd")]
    pub budget_usd: Option<f64>,
    /// New narration backend.
    pub tts_provider: Option<String>,
    /// Stage lists to replace.
    pub stage_providers: Option<StageProviders>,
    /// Image stage lists to replace.
    pub image_stage_providers: Option<ImageStageProviders>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_enabled_backends() {
        let config = AppConfig::default();
        let enabled: Vec<_> = config
            .providers
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(enabled, vec![ModelProvider::Kimi, ModelProvider::Qwen]);
        assert!(config.image_providers.values().all(|p| !p.enabled));
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.model_of(ModelProvider::Openai), "gpt-4o-mini");
    }

    #[test]
    fn test_default_stage_mapping() {
        let config = AppConfig::default();
        assert_eq!(
            config.stage_providers[&StageKind::FinalMerge],
            vec![ModelProvider::Qwen]
        );
        assert_eq!(config.stage_providers[&StageKind::OutlineMulti].len(), 7);
        assert!(config.stage_providers[&StageKind::ImagePrompts].is_empty());
    }

    #[test]
    fn test_serialize_camel_case_keys() {
        let value = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(value["budgetUSD"], json!(1.0));
        assert_eq!(value["stageProviders"]["outline-merge"], json!(["qwen"]));
        assert_eq!(value["providers"]["kimi"]["useWebSearch"], json!(true));
        assert!(value["imageStageProviders"]["image-generation"].is_array());
    }

    #[test]
    fn test_patch_merges_key_by_key() {
        let patch: ConfigPatch = serde_json::from_value(json!({
            "providers": {"openai": {"enabled": true, "model": "gpt-4o"}},
            "stageProviders": {"final-merge": ["openai", "qwen"]},
            "concurrency": 8
        }))
        .unwrap();
        let config = AppConfig::default().merged(patch);

        assert!(config.providers[&ModelProvider::Openai].enabled);
        assert!(config.providers[&ModelProvider::Kimi].enabled);
        assert_eq!(
            config.stage_providers[&StageKind::FinalMerge],
            vec![ModelProvider::Openai, ModelProvider::Qwen]
        );
        assert_eq!(config.stage_providers[&StageKind::OutlineMerge], vec![ModelProvider::Qwen]);
        assert_eq!(config.concurrency, 8);
        assert!((config.budget_usd - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let config = ProviderConfig::new(true, "m").with_api_key("  ");
        assert!(config.api_key().is_none());
        assert_eq!(
            ProviderConfig::new(true, "m").with_api_key("k").api_key(),
            Some("k")
        );
    }
}
