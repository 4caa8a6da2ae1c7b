//! Prompt templates per stage.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::StageKind;

/// Stages that carry a prompt template.
pub const PROMPT_KEYS: [StageKind; 9] = [
    StageKind::Intent,
    StageKind::OutlineMulti,
    StageKind::OutlineMerge,
    StageKind::WriteSections,
    StageKind::MergeAssembly,
    StageKind::ExpertReview,
    StageKind::FactCheck,
    StageKind::FinalMerge,
    StageKind::ImagePrompts,
];

/// A full set of prompt templates keyed by stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prompts(BTreeMap<StageKind, String>);

impl Prompts {
    /// Returns the template for a stage, or an empty string.
    #[must_use]
    pub fn get(&self, stage: StageKind) -> &str {
        self.0.get(&stage).map_or("", String::as_str)
    }

    /// Overrides templates present in `patch`.
    pub fn apply(&mut self, patch: BTreeMap<StageKind, String>) {
        self.0.extend(patch);
    }

    /// Iterates over `(stage, template)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&StageKind, &String)> {
        self.0.iter()
    }
}

impl Default for Prompts {
    fn default() -> Self {
        let entries = [
            (
                StageKind::Intent,
                "You are a writing-intent analyst. From the given topic, audience, style, goals, \
                 constraints and references, produce a structured intent as JSON: \
                 { intent: { topic, audience, style, goals[], constraints[], references[] } }.",
            ),
            (
                StageKind::OutlineMulti,
                "You are an outline expert. Produce a structured outline for the given topic, \
                 considering the audience and style. Output JSON: \
                 { title, sections: [{ id, title, bullets[], requiresEvidence? }] }.",
            ),
            (
                StageKind::OutlineMerge,
                "You merge outlines. Given several outlines, deduplicate and combine them into \
                 one clear, complete outline with at most 8 sections. Output the same JSON shape.",
            ),
            (
                StageKind::WriteSections,
                "You are a section writer. For the given outline section, write the section in \
                 Markdown, keep the requested style, and mark facts that need citations.",
            ),
            (
                StageKind::MergeAssembly,
                "You are an editor. Merge the section drafts into one complete Markdown document, \
                 unify terminology, add transitions and a sensible title.",
            ),
            (
                StageKind::ExpertReview,
                "You are a domain expert reviewer. Report problems and suggestions as JSON: \
                 { issues: [{ locationId, severity, suggestion, rationale }] }, focusing on \
                 accuracy, logic and structure.",
            ),
            (
                StageKind::FactCheck,
                "You are a fact checker. Verify the key claims one by one and return evidence as \
                 JSON: { sources: [{ url, snippet, confidence }] }.",
            ),
            (
                StageKind::FinalMerge,
                "Produce a publication-ready Markdown document. Use one '# ' title, numbered \
                 '## ' sections ('## 1. ...'), '###' for subsections, a conclusion and a \
                 references section. Avoid vague or repeated headings and placeholder sentences. \
                 If image prompts or images are provided, reference them where they fit. \
                 Input: { doc, review, intent, imagePrompts? }. Output Markdown only.",
            ),
            (
                StageKind::ImagePrompts,
                "You design image prompts. Write one prompt per outline section describing \
                 subject, scene, style, lighting and composition, without text watermarks or \
                 sensitive content. Output JSON: { images: [{ sectionId, title, prompt }] }.",
            ),
        ];
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
        )
    }
}

/// Source of prompt templates.
pub trait PromptStore: Send + Sync {
    /// Returns the current templates.
    fn get_prompts(&self) -> Prompts;

    /// Overrides the templates present in `patch`.
    fn set_prompts(&self, patch: BTreeMap<StageKind, String>) -> Prompts;

    /// Restores the built-in templates.
    fn reset_prompts(&self) -> Prompts;
}

/// A process-local prompt store seeded with the built-in templates.
#[derive(Debug, Default)]
pub struct InMemoryPromptStore {
    prompts: RwLock<Prompts>,
}

impl InMemoryPromptStore {
    /// Creates a store with the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PromptStore for InMemoryPromptStore {
    fn get_prompts(&self) -> Prompts {
        self.prompts.read().clone()
    }

    fn set_prompts(&self, patch: BTreeMap<StageKind, String>) -> Prompts {
        let mut guard = self.prompts.write();
        guard.apply(patch);
        guard.clone()
    }

    fn reset_prompts(&self) -> Prompts {
        let mut guard = self.prompts.write();
        *guard = Prompts::default();
        guard.clone()
    }
}
