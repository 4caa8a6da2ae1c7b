//! Runs the ten content stages in order and closes out the run.

use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Instrument};

use super::run_context::{RunContext, RunOptions};
use super::stages::ImageOutcome;
use crate::assembler::{assemble, RepairContext};
use crate::config::{AppConfig, Prompts};
use crate::core::{RunState, StageKind};
use crate::errors::DraftflowError;
use crate::executor::defaults::final_placeholder;
use crate::executor::Executor;
use crate::image::ImageBackend;
use crate::llm::ClientRegistry;
use crate::model::{FinalDoc, PipelineInput};
use crate::observability::run_span;
use crate::providers::BackendLimiter;
use crate::snapshot::{GitVersionControl, SnapshotStore, VersionControl};
use crate::streaming::StreamingAggregator;
use crate::utils::iso_timestamp;

/// Drives one document through the pipeline.
///
/// The configuration and prompt templates are captured at construction and
/// never re-read, so every run of an orchestrator sees the same snapshot.
pub struct Orchestrator {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) prompts: Arc<Prompts>,
    pub(crate) executor: Executor,
    pub(crate) image_backend: Option<Arc<dyn ImageBackend>>,
    root: PathBuf,
    vcs: Arc<dyn VersionControl>,
}

impl Orchestrator {
    /// Creates an orchestrator writing snapshots under the current directory
    /// and committing them with git.
    #[must_use]
    pub fn new(config: AppConfig, prompts: Prompts, registry: ClientRegistry) -> Self {
        let config = Arc::new(config);
        Self {
            executor: Executor::new(Arc::new(registry), config.clone()),
            config,
            prompts: Arc::new(prompts),
            image_backend: None,
            root: PathBuf::from("."),
            vcs: Arc::new(GitVersionControl::new()),
        }
    }

    /// Sets the directory that holds `runs/`.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the version-control backend for snapshot commits.
    #[must_use]
    pub fn with_version_control(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Uses a private rate limiter instead of the process-wide one.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<BackendLimiter>) -> Self {
        self.executor = self.executor.with_limiter(limiter);
        self
    }

    /// Uses `backend` whenever jimeng is selected, instead of building the
    /// signed client from the configured credentials.
    #[must_use]
    pub fn with_image_backend(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.image_backend = Some(backend);
        self
    }

    /// The configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Runs every stage and returns the finished run.
    ///
    /// # Errors
    ///
    /// Returns [`DraftflowError::Aborted`] when the cancellation token fires;
    /// the snapshots written before that point stay on disk. Backend,
    /// image, snapshot and repair failures are absorbed.
    pub async fn run(
        &self,
        input: PipelineInput,
        options: RunOptions,
    ) -> Result<RunState, DraftflowError> {
        let run = RunState::new();
        let span = run_span(&run.id);
        let snapshots = SnapshotStore::new(&self.root, run.id.clone(), &iso_timestamp(), self.vcs.clone());
        let ctx = RunContext::new(run, options, snapshots);
        self.drive(input, ctx).instrument(span).await
    }

    async fn drive(&self, input: PipelineInput, mut ctx: RunContext) -> Result<RunState, DraftflowError> {
        let PipelineInput { intent, files } = input;
        info!(run_id = %ctx.run_id(), topic = ?intent.topic, "Run started");

        ctx.begin(StageKind::Intent)?;
        let data = json!({
            "intent": intent,
            "files": files,
            "prompt": self.prompts.get(StageKind::Intent),
            "providers": self.providers(StageKind::Intent),
        });
        ctx.complete(data).await?;

        ctx.begin(StageKind::OutlineMulti)?;
        let outlines = self.outline_multi(&intent).await;
        let data = self.stage_data(StageKind::OutlineMulti, json!({ "outlines": outlines }));
        ctx.complete(data).await?;

        ctx.begin(StageKind::OutlineMerge)?;
        let outline = self.outline_merge(&outlines, &intent).await;
        ctx.run.outline = Some(outline.clone());
        let data = self.stage_data(StageKind::OutlineMerge, json!({ "outline": outline }));
        ctx.complete(data).await?;

        ctx.begin(StageKind::WriteSections)?;
        let drafts = self.write_sections(&outline, &intent).await;
        ctx.run.draft_sections = Some(drafts.clone());
        let data = self.stage_data(StageKind::WriteSections, json!({ "drafts": drafts }));
        ctx.complete(data).await?;

        ctx.begin(StageKind::ImagePrompts)?;
        let (image_prompts, designed_by) = self.image_prompts(&outline, &intent).await;
        let data = self.stage_data(
            StageKind::ImagePrompts,
            json!({
                "imagePrompts": { "images": image_prompts },
                "designedBy": designed_by,
            }),
        );
        ctx.complete(data).await?;

        ctx.begin(StageKind::ImageGeneration)?;
        let ImageOutcome { images, provider, info } = self.image_generation(&image_prompts).await;
        ctx.complete(json!({ "images": images, "provider": provider, "info": info }))
            .await?;

        ctx.begin(StageKind::MergeAssembly)?;
        let merged = self.merge_assembly(&drafts).await;
        let data = self.stage_data(StageKind::MergeAssembly, json!({ "doc": FinalDoc::new(merged.as_str()) }));
        ctx.complete(data).await?;

        ctx.begin(StageKind::ExpertReview)?;
        let review = self.expert_review(&merged, &outline, &intent).await;
        let data = self.stage_data(StageKind::ExpertReview, json!({ "review": review }));
        ctx.complete(data).await?;

        ctx.begin(StageKind::FactCheck)?;
        let facts = self.fact_check(&merged).await;
        let data = self.stage_data(StageKind::FactCheck, fact_check_body(facts));
        ctx.complete(data).await?;

        ctx.begin(StageKind::FinalMerge)?;
        let providers = self.providers(StageKind::FinalMerge);
        let system = self.prompts.get(StageKind::FinalMerge);
        let user = super::stages::pretty(&json!({
            "doc": { "markdown": merged },
            "review": review,
            "intent": intent,
            "imagePrompts": { "images": image_prompts },
        }));
        let aggregator = StreamingAggregator::new(&self.executor, ctx.options.progress.clone());
        let outcome = aggregator.run(&providers, system, &user, &ctx.run).await;
        let raw = outcome
            .as_ref()
            .map_or_else(|| final_placeholder(&merged), |o| o.markdown.clone());
        let assembly = assemble(
            &raw,
            &RepairContext {
                outline: Some(&outline),
                drafts: &drafts,
                prompts: &image_prompts,
                images: &images,
            },
        );
        let final_doc = FinalDoc::new(assembly.markdown);
        ctx.run.final_doc = Some(final_doc.clone());
        let data = self.stage_data(
            StageKind::FinalMerge,
            json!({
                "final": final_doc,
                "acceptedFrom": outcome.as_ref().map(|o| o.provider),
                "streamed": outcome.as_ref().is_some_and(|o| o.streamed),
                "repairFailures": assembly.failures,
            }),
        );
        ctx.complete(data).await?;

        ctx.begin(StageKind::Git)?;
        ctx.complete(json!({ "commits": ctx.snapshots.commits() })).await?;
        ctx.begin(StageKind::Tts)?;
        ctx.complete(json!({ "provider": self.config.tts_provider })).await?;
        ctx.emit().await;

        info!(run_id = %ctx.run_id(), "Run finished");
        Ok(ctx.run)
    }

    /// Adds the stage's prompt template and selected providers to `body`.
    fn stage_data(&self, stage: StageKind, mut body: Value) -> Value {
        if let Value::Object(map) = &mut body {
            map.insert("prompt".to_string(), json!(self.prompts.get(stage)));
            map.insert("providers".to_string(), json!(self.providers(stage)));
        }
        body
    }
}

fn fact_check_body(facts: Value) -> Value {
    match facts {
        Value::Object(_) => facts,
        other => json!({ "result": other }),
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("root", &self.root)
            .field("executor", &self.executor)
            .field("image_backend", &self.image_backend.as_ref().map(|b| b.name().to_string()))
            .finish_non_exhaustive()
    }
}
