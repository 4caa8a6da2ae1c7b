//! Work done inside each content stage, minus the node bookkeeping.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::Orchestrator;
use crate::config::{ImageProvider, ModelProvider};
use crate::core::StageKind;
use crate::executor::defaults::{assemble_drafts, merge_outlines, placeholder_outlines};
use crate::executor::{fan_out, first_success, round_robin};
use crate::image::{resolve_images, ImageBackend};
use crate::model::{
    fact_check_placeholder, DraftSection, GeneratedImage, ImagePrompt, Intent, Outline, Review,
};
use crate::providers::{selected, selected_image};

/// Which image path was taken and why.
#[derive(Debug, Clone)]
pub(crate) struct ImageOutcome {
    pub(crate) images: Vec<GeneratedImage>,
    pub(crate) provider: &'static str,
    pub(crate) info: String,
}

/// Pretty JSON for a user message.
pub(crate) fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// The prompt written locally when no backend designed one.
#[must_use]
pub fn compose_image_prompt(intent: &Intent, title: &str) -> String {
    format!(
        "Illustration for the topic \"{}\", section \"{}\": a clear subject in a scene that fits \
         the content; style: {}; balanced composition (rule of thirds or centered); natural \
         lighting; no text, watermarks, graphic violence or sensitive elements. Describe it in \
         one line.",
        intent.topic.as_deref().unwrap_or_default(),
        title,
        intent
            .style
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("realistic or illustrated"),
    )
}

impl Orchestrator {
    pub(crate) fn providers(&self, stage: StageKind) -> Vec<ModelProvider> {
        selected(stage, &self.config)
    }

    pub(crate) async fn outline_multi(&self, intent: &Intent) -> Vec<Outline> {
        let providers = self.providers(StageKind::OutlineMulti);
        let system = self.prompts.get(StageKind::OutlineMulti);
        let user = pretty(&json!({
            "topic": intent.topic,
            "audience": intent.audience,
            "style": intent.style,
        }));
        let user = user.as_str();

        let outlines = fan_out(&providers, |p| async move {
            self.executor
                .ask_json(p, system, user)
                .await
                .and_then(|v| Outline::from_value(&v))
        })
        .await;

        if outlines.is_empty() {
            info!("No outline candidates, using placeholders");
            placeholder_outlines(&intent.title_or_untitled())
        } else {
            outlines
        }
    }

    pub(crate) async fn outline_merge(&self, outlines: &[Outline], intent: &Intent) -> Outline {
        let providers = self.providers(StageKind::OutlineMerge);
        let system = self.prompts.get(StageKind::OutlineMerge);
        let user = pretty(&json!({ "outlines": outlines }));
        let user = user.as_str();

        first_success(&providers, |p| async move {
            self.executor
                .ask_json(p, system, user)
                .await
                .and_then(|v| Outline::from_value(&v))
        })
        .await
        .map_or_else(
            || merge_outlines(outlines, &intent.title_or_untitled()),
            |(_, outline)| outline,
        )
    }

    /// One draft per section, in outline order, round-robin over backends.
    pub(crate) async fn write_sections(&self, outline: &Outline, intent: &Intent) -> Vec<DraftSection> {
        let providers = self.providers(StageKind::WriteSections);
        let system = self.prompts.get(StageKind::WriteSections);

        let jobs = outline.sections.iter().enumerate().map(|(i, section)| {
            let provider = round_robin(i, &providers);
            async move {
                let text = match provider {
                    Some(p) => {
                        let user = pretty(&json!({ "section": section, "intent": intent }));
                        self.executor.ask_text(p, system, &user).await
                    }
                    None => None,
                };
                match text {
                    Some(markdown) => DraftSection::new(section.id.clone(), markdown),
                    None => {
                        debug!(section = %section.id, "Placeholder draft");
                        DraftSection::placeholder(section.id.clone(), &section.title)
                    }
                }
            }
        });
        join_all(jobs).await
    }

    /// Backend-designed prompts when any backend answers, otherwise one
    /// locally composed prompt per section.
    pub(crate) async fn image_prompts(
        &self,
        outline: &Outline,
        intent: &Intent,
    ) -> (Vec<ImagePrompt>, Option<ModelProvider>) {
        let providers = self.providers(StageKind::ImagePrompts);
        let system = self.prompts.get(StageKind::ImagePrompts);
        let user = pretty(&json!({ "outline": outline, "intent": intent }));
        let user = user.as_str();

        let designed = first_success(&providers, |p| async move {
            let value = self.executor.ask_json(p, system, user).await?;
            let prompts: Vec<ImagePrompt> =
                serde_json::from_value(value.get("images")?.clone()).ok()?;
            let usable = !prompts.is_empty() && prompts.iter().all(|i| !i.prompt.trim().is_empty());
            usable.then_some(prompts)
        })
        .await;

        if let Some((provider, prompts)) = designed {
            return (prompts, Some(provider));
        }
        let prompts = outline
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let title = if s.title.trim().is_empty() {
                    format!("Part {}", i + 1)
                } else {
                    s.title.clone()
                };
                let prompt = compose_image_prompt(intent, &title);
                ImagePrompt::new(s.id.clone(), title, prompt)
            })
            .collect();
        (prompts, None)
    }

    pub(crate) async fn image_generation(&self, prompts: &[ImagePrompt]) -> ImageOutcome {
        let (backend, info) = self.image_backend();
        let provider = if backend.is_some() { "jimeng" } else { "placeholder" };
        info!(provider, info = %info, "Image generation");
        let images = resolve_images(backend.as_deref(), prompts).await;
        ImageOutcome {
            images,
            provider,
            info,
        }
    }

    fn image_backend(&self) -> (Option<Arc<dyn ImageBackend>>, String) {
        if !selected_image(&self.config).contains(&ImageProvider::Jimeng) {
            return (
                None,
                "jimeng not selected for image-generation, using placeholders".to_string(),
            );
        }
        if let Some(backend) = &self.image_backend {
            return (
                Some(backend.clone()),
                format!("using {} (sequential)", backend.name()),
            );
        }
        self.jimeng_from_config()
    }

    #[cfg(feature = "http")]
    fn jimeng_from_config(&self) -> (Option<Arc<dyn ImageBackend>>, String) {
        use crate::image::{resolve_credentials, JimengImageBackend};

        let settings = self
            .config
            .image_providers
            .get(&ImageProvider::Jimeng)
            .cloned()
            .unwrap_or_default();
        let Some((credentials, source)) = resolve_credentials(&settings) else {
            return (None, "missing AK/SK, using placeholders".to_string());
        };
        match JimengImageBackend::new(credentials) {
            Ok(backend) => (
                Some(Arc::new(backend)),
                format!("using jimeng (credentials from {source}, sequential)"),
            ),
            Err(e) => (None, format!("jimeng unavailable ({e}), using placeholders")),
        }
    }

    #[cfg(not(feature = "http"))]
    fn jimeng_from_config(&self) -> (Option<Arc<dyn ImageBackend>>, String) {
        (None, "built without http support, using placeholders".to_string())
    }

    pub(crate) async fn merge_assembly(&self, drafts: &[DraftSection]) -> String {
        let providers = self.providers(StageKind::MergeAssembly);
        let system = self.prompts.get(StageKind::MergeAssembly);
        let user = pretty(&json!({ "drafts": drafts }));
        let user = user.as_str();

        first_success(&providers, |p| async move {
            self.executor.ask_text(p, system, user).await
        })
        .await
        .map_or_else(|| assemble_drafts(drafts), |(_, text)| text)
    }

    pub(crate) async fn expert_review(&self, doc: &str, outline: &Outline, intent: &Intent) -> Review {
        let providers = self.providers(StageKind::ExpertReview);
        let system = self.prompts.get(StageKind::ExpertReview);
        let user = pretty(&json!({
            "doc": { "markdown": doc },
            "outline": outline,
            "intent": intent,
        }));
        let user = user.as_str();

        first_success(&providers, |p| async move {
            self.executor
                .ask_json(p, system, user)
                .await
                .and_then(|v| Review::from_value(&v))
        })
        .await
        .map(|(_, review)| review)
        .unwrap_or_default()
    }

    pub(crate) async fn fact_check(&self, doc: &str) -> Value {
        let providers = self.providers(StageKind::FactCheck);
        let system = self.prompts.get(StageKind::FactCheck);
        let user = pretty(&json!({ "doc": { "markdown": doc } }));
        let user = user.as_str();

        first_success(&providers, |p| async move {
            self.executor.ask_json(p, system, user).await
        })
        .await
        .map_or_else(fact_check_placeholder, |(_, v)| v)
    }
}
