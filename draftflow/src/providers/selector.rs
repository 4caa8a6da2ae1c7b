//! Backend selection per stage.
//!
//! Both functions are pure: same configuration, same answer. An empty result
//! is valid and means the stage falls back to its default.

use crate::config::{AppConfig, ImageProvider, ModelProvider};
use crate::core::StageKind;

/// Enabled text backends configured for `stage`, in configured order.
///
/// There is no cross-stage fallback: a stage with no enabled backends gets
/// an empty list.
#[must_use]
pub fn selected(stage: StageKind, config: &AppConfig) -> Vec<ModelProvider> {
    config
        .stage_providers
        .get(&stage)
        .map(|list| {
            list.iter()
                .copied()
                .filter(|p| config.providers.get(p).is_some_and(|c| c.enabled))
                .collect()
        })
        .unwrap_or_default()
}

/// Enabled image backends for the image-generation stage.
///
/// When the configured list has no enabled entry, every globally enabled
/// image backend is returned in declaration order.
#[must_use]
pub fn selected_image(config: &AppConfig) -> Vec<ImageProvider> {
    let enabled = |p: &ImageProvider| config.image_providers.get(p).is_some_and(|c| c.enabled);

    let configured: Vec<ImageProvider> = config
        .image_stage_providers
        .get(&StageKind::ImageGeneration)
        .map(|list| list.iter().copied().filter(enabled).collect())
        .unwrap_or_default();

    if configured.is_empty() {
        ImageProvider::ALL.into_iter().filter(enabled).collect()
    } else {
        configured
    }
}
