//! Configuration and prompt fixtures.

use std::collections::BTreeMap;

use crate::config::{AppConfig, ModelProvider, Prompts, ProviderConfig, PROMPT_KEYS};
use crate::core::StageKind;

/// Prompt templates that are just the stage name, so scripted clients can
/// key replies on the stage.
#[must_use]
pub fn stage_name_prompts() -> Prompts {
    let mut prompts = Prompts::default();
    prompts.apply(
        PROMPT_KEYS
            .iter()
            .map(|k| (*k, k.as_str().to_string()))
            .collect::<BTreeMap<_, _>>(),
    );
    prompts
}

/// A configuration where exactly `providers` are enabled and every content
/// stage maps to them in the given order. Image prompts keep an empty list.
#[must_use]
pub fn config_with(providers: &[ModelProvider]) -> AppConfig {
    let mut config = AppConfig::default();
    for (provider, settings) in &mut config.providers {
        settings.enabled = providers.contains(provider);
    }
    for stage in StageKind::CONTENT {
        let list = if stage == StageKind::ImagePrompts || stage == StageKind::ImageGeneration {
            Vec::new()
        } else {
            providers.to_vec()
        };
        config.stage_providers.insert(stage, list);
    }
    config
}

/// A configuration with no enabled backend at all.
#[must_use]
pub fn offline_config() -> AppConfig {
    config_with(&[])
}

/// Enables a single backend with an API key.
#[must_use]
pub fn keyed(provider: ModelProvider, key: &str) -> ProviderConfig {
    ProviderConfig::new(true, provider.as_str()).with_api_key(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::selected;

    #[test]
    fn test_stage_name_prompts() {
        let prompts = stage_name_prompts();
        assert_eq!(prompts.get(StageKind::FinalMerge), "final-merge");
        assert_eq!(prompts.get(StageKind::ImagePrompts), "image-prompts");
    }

    #[test]
    fn test_config_with() {
        let config = config_with(&[ModelProvider::Openai, ModelProvider::Kimi]);
        assert_eq!(
            selected(StageKind::OutlineMerge, &config),
            vec![ModelProvider::Openai, ModelProvider::Kimi]
        );
        assert!(selected(StageKind::ImagePrompts, &config).is_empty());
        assert!(selected(StageKind::FinalMerge, &offline_config()).is_empty());
    }
}
