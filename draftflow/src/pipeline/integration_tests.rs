//! End-to-end runs of the pipeline against scripted backends.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::{AppConfig, ImageProvider, ModelProvider, ProviderConfig};
    use crate::core::{NodeStatus, RunState, StageKind};
    use crate::errors::{ChatError, DraftflowError, ImageError, SnapshotError};
    use crate::events::{CollectingProgressSink, ProgressSink};
    use crate::image::ImageBackend;
    use crate::llm::ClientRegistry;
    use crate::model::{Intent, PipelineInput};
    use crate::pipeline::{Orchestrator, RunOptions};
    use crate::providers::BackendLimiter;
    use crate::snapshot::{NoopVersionControl, VersionControl, RUNS_DIR};
    use crate::testing::{config_with, offline_config, stage_name_prompts, Reply, ScriptedChatClient};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;

    fn orchestrator(config: AppConfig, registry: ClientRegistry, root: &Path) -> Orchestrator {
        Orchestrator::new(config, stage_name_prompts(), registry)
            .with_root(root)
            .with_version_control(Arc::new(NoopVersionControl))
            .with_limiter(Arc::new(BackendLimiter::new()))
    }

    fn input() -> PipelineInput {
        PipelineInput::new(Intent::with_topic("Tide pools"))
    }

    fn two_section_outline() -> serde_json::Value {
        json!({
            "title": "Guide",
            "sections": [
                { "id": "s1", "title": "Intro" },
                { "id": "s2", "title": "Details" }
            ]
        })
    }

    fn guide_writer(name: &str) -> ScriptedChatClient {
        ScriptedChatClient::new(name)
            .on("outline-multi", Reply::Json(two_section_outline()))
            .on("outline-merge", Reply::Json(two_section_outline()))
            .on("write-sections", Reply::text("Body text."))
            .on("final-merge", Reply::text("Just prose."))
            .otherwise(Reply::text("merged"))
    }

    fn snapshot_files(root: &Path) -> Vec<String> {
        let runs = root.join(RUNS_DIR);
        let mut names = Vec::new();
        for run in std::fs::read_dir(runs).unwrap() {
            for file in std::fs::read_dir(run.unwrap().path()).unwrap() {
                names.push(file.unwrap().file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        names
    }

    struct CountingImages {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageBackend for CountingImages {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, prompt: &str, _width: u32, _height: u32) -> Result<String, ImageError> {
            let mut prompts = self.prompts.lock();
            prompts.push(prompt.to_string());
            Ok(format!("https://img.test/{}.png", prompts.len()))
        }
    }

    struct RecordingVcs {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VersionControl for RecordingVcs {
        async fn commit(&self, _repo: &Path, file: &Path, message: &str) -> Result<Option<String>, SnapshotError> {
            assert!(file.is_relative());
            let mut messages = self.messages.lock();
            messages.push(message.to_string());
            Ok(Some(format!("rev{}", messages.len())))
        }
    }

    struct CancelAfter {
        stage: StageKind,
        token: Arc<CancellationToken>,
    }

    #[async_trait]
    impl ProgressSink for CancelAfter {
        async fn publish(&self, snapshot: RunState) {
            if snapshot
                .node(self.stage)
                .is_some_and(|n| n.status == NodeStatus::Done)
            {
                self.token.cancel("user stop");
            }
        }
    }

    #[tokio::test]
    async fn test_node_order_and_snapshot_files() {
        let dir = tempfile::tempdir().unwrap();
        let run = orchestrator(offline_config(), ClientRegistry::new(), dir.path())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        let mut expected = StageKind::CONTENT.to_vec();
        expected.extend([StageKind::Git, StageKind::Tts]);
        assert_eq!(run.kinds(), expected);
        assert!(run.nodes.iter().all(|n| n.status == NodeStatus::Done));
        assert_eq!(
            snapshot_files(dir.path()),
            vec![
                "01_intent.json",
                "02_outline-multi.json",
                "03_outline-merge.json",
                "04_write-sections.json",
                "04b_image-prompts.json",
                "04c_image-generation.json",
                "05_merge-assembly.json",
                "06_expert-review.json",
                "07_fact-check.json",
                "08_final-merge.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_offline_outline_is_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let run = orchestrator(offline_config(), ClientRegistry::new(), dir.path())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        let candidates = run.node(StageKind::OutlineMulti).unwrap().data.clone().unwrap();
        assert_eq!(candidates["outlines"].as_array().unwrap().len(), 3);

        let outline = run.outline.clone().unwrap();
        let titles: Vec<_> = outline.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Section 1", "Section 2", "Section 3", "Section 4", "Section 5"]);
        assert!(outline.sections.iter().all(|s| s.bullets.as_deref()
            == Some(&["Point A".to_string(), "Point B".to_string()][..])));

        let images = run.node(StageKind::ImageGeneration).unwrap().data.clone().unwrap();
        let images = images["images"].as_array().unwrap();
        assert_eq!(images.len(), 5);
        assert!(images
            .iter()
            .all(|i| i["url"].as_str().unwrap().starts_with("data:image/svg+xml;utf8,")));
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let qwen = Arc::new(
            guide_writer("qwen")
                .once("expert-review", Reply::Fail(ChatError::http(503, "busy"))),
        );
        let openai = Arc::new(
            ScriptedChatClient::new("openai")
                .on("expert-review", Reply::Json(json!({ "issues": [] })))
                .otherwise(Reply::text("from openai")),
        );
        let registry = ClientRegistry::new()
            .with_client(ModelProvider::Qwen, qwen.clone())
            .with_client(ModelProvider::Openai, openai.clone());

        let run = orchestrator(
            config_with(&[ModelProvider::Qwen, ModelProvider::Openai]),
            registry,
            dir.path(),
        )
        .run(input(), RunOptions::new())
        .await
        .unwrap();

        assert_eq!(qwen.calls_matching("outline-merge"), 1);
        assert_eq!(openai.calls_matching("outline-merge"), 0);
        assert_eq!(qwen.calls_matching("merge-assembly"), 1);
        assert_eq!(openai.calls_matching("merge-assembly"), 0);
        assert_eq!(qwen.calls_matching("expert-review"), 1);
        assert_eq!(openai.calls_matching("expert-review"), 1);
        assert_eq!(openai.calls_matching("final-merge"), 0);

        // Both backends are asked for an outline; each section goes to one.
        assert_eq!(qwen.calls_matching("outline-multi"), 1);
        assert_eq!(openai.calls_matching("outline-multi"), 1);
        assert_eq!(qwen.calls_matching("write-sections"), 1);
        assert_eq!(openai.calls_matching("write-sections"), 1);

        let review = run.node(StageKind::ExpertReview).unwrap().data.clone().unwrap();
        assert_eq!(review["review"], json!({ "issues": [] }));
        let final_node = run.node(StageKind::FinalMerge).unwrap().data.clone().unwrap();
        assert_eq!(final_node["acceptedFrom"], "qwen");
    }

    #[tokio::test]
    async fn test_sections_rebuilt_from_outline() {
        let dir = tempfile::tempdir().unwrap();
        let qwen = Arc::new(guide_writer("qwen"));
        let registry = ClientRegistry::new().with_client(ModelProvider::Qwen, qwen);

        let run = orchestrator(config_with(&[ModelProvider::Qwen]), registry, dir.path())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        let md = run.final_doc.unwrap().markdown;
        assert!(md.starts_with("# Final Draft\n\n## Overview\n\nJust prose."));
        let intro = md.find("## 1. Intro").unwrap();
        let details = md.find("## 2. Details").unwrap();
        assert!(intro < details);
        assert!(md.contains("## 1. Intro\n\n![Intro](data:image/svg+xml;utf8,"));
        assert!(md.contains("## Appendix: Image Prompts\n- 1. Intro: "));
        assert!(!md.contains("## Image Preview"));
    }

    #[tokio::test]
    async fn test_injected_images_placed_inline() {
        let dir = tempfile::tempdir().unwrap();
        let registry =
            ClientRegistry::new().with_client(ModelProvider::Qwen, Arc::new(guide_writer("qwen")));
        let config = config_with(&[ModelProvider::Qwen])
            .with_image_provider(ImageProvider::Jimeng, ProviderConfig::new(true, "jimeng"));
        let images = Arc::new(CountingImages {
            prompts: Mutex::new(Vec::new()),
        });

        let run = orchestrator(config, registry, dir.path())
            .with_image_backend(images.clone())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        assert_eq!(images.prompts.lock().len(), 2);
        let node = run.node(StageKind::ImageGeneration).unwrap().data.clone().unwrap();
        assert_eq!(node["provider"], "jimeng");

        let md = run.final_doc.unwrap().markdown;
        assert!(md.contains("## 1. Intro\n\n![Intro](https://img.test/1.png)\n"));
        assert!(md.contains("## 2. Details\n\n![Details](https://img.test/2.png)\n"));
    }

    #[tokio::test]
    async fn test_injected_images_ignored_unless_jimeng_selected() {
        let dir = tempfile::tempdir().unwrap();
        let images = Arc::new(CountingImages {
            prompts: Mutex::new(Vec::new()),
        });

        let run = orchestrator(offline_config(), ClientRegistry::new(), dir.path())
            .with_image_backend(images.clone())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        assert!(images.prompts.lock().is_empty());
        let node = run.node(StageKind::ImageGeneration).unwrap().data.clone().unwrap();
        assert_eq!(node["provider"], "placeholder");
    }

    #[tokio::test]
    async fn test_cancel_after_outline_merge() {
        let dir = tempfile::tempdir().unwrap();
        let token = Arc::new(CancellationToken::new());
        let sink = Arc::new(CancelAfter {
            stage: StageKind::OutlineMerge,
            token: token.clone(),
        });

        let result = orchestrator(offline_config(), ClientRegistry::new(), dir.path())
            .run(input(), RunOptions::new().with_progress(sink).with_cancel(token))
            .await;

        assert!(matches!(result, Err(DraftflowError::Aborted(ref r)) if r == "user stop"));
        assert_eq!(
            snapshot_files(dir.path()),
            vec!["01_intent.json", "02_outline-multi.json", "03_outline-merge.json"]
        );
    }

    #[tokio::test]
    async fn test_streamed_final_grows_monotonically() {
        let dir = tempfile::tempdir().unwrap();
        let qwen = Arc::new(
            guide_writer("qwen")
                .streaming()
                .once("final-merge", Reply::stream(["# Guide\n\n", "## Intro\n\n", "Tides."])),
        );
        let registry = ClientRegistry::new().with_client(ModelProvider::Qwen, qwen);
        let sink = Arc::new(CollectingProgressSink::new());

        let run = orchestrator(config_with(&[ModelProvider::Qwen]), registry, dir.path())
            .run(input(), RunOptions::new().with_progress(sink.clone()))
            .await
            .unwrap();

        let lengths = sink.final_lengths();
        assert!(lengths.len() >= 3);
        assert_eq!(&lengths[..3], &[9, 19, 25]);
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));

        let data = run.node(StageKind::FinalMerge).unwrap().data.clone().unwrap();
        assert_eq!(data["streamed"], true);
        let md = run.final_doc.unwrap().markdown;
        assert!(md.starts_with("# Guide\n\n## Intro\n\n![Intro]("));
        assert_eq!(sink.last().unwrap().kinds().last(), Some(&StageKind::Tts));
    }

    #[tokio::test]
    async fn test_failed_stream_discards_partial_text() {
        let dir = tempfile::tempdir().unwrap();
        let qwen = Arc::new(
            guide_writer("qwen")
                .streaming()
                .once("final-merge", Reply::StreamThenFail(vec!["PARTIAL".to_string()])),
        );
        let openai = Arc::new(
            ScriptedChatClient::new("openai")
                .streaming()
                .on("final-merge", Reply::stream(["# Done\n\n", "## Intro\n\nok"]))
                .otherwise(Reply::Fail(ChatError::EmptyResponse)),
        );
        let registry = ClientRegistry::new()
            .with_client(ModelProvider::Qwen, qwen)
            .with_client(ModelProvider::Openai, openai);
        let config = config_with(&[ModelProvider::Qwen, ModelProvider::Openai]);

        let run = orchestrator(config, registry, dir.path())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        let data = run.node(StageKind::FinalMerge).unwrap().data.clone().unwrap();
        assert_eq!(data["acceptedFrom"], "openai");
        let md = run.final_doc.unwrap().markdown;
        assert!(md.starts_with("# Done"));
        assert!(!md.contains("PARTIAL"));
    }

    #[tokio::test]
    async fn test_every_content_stage_committed() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = Arc::new(RecordingVcs {
            messages: Mutex::new(Vec::new()),
        });

        let run = orchestrator(offline_config(), ClientRegistry::new(), dir.path())
            .with_version_control(vcs.clone())
            .run(input(), RunOptions::new())
            .await
            .unwrap();

        let messages = vcs.messages.lock().clone();
        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0], format!("[run:{}] 01_intent", run.id));
        assert_eq!(messages[9], format!("[run:{}] 08_final-merge", run.id));
        let git = run.node(StageKind::Git).unwrap().data.clone().unwrap();
        assert_eq!(git["commits"].as_array().unwrap().len(), 10);
        assert_eq!(git["commits"][0], "rev1");
    }
}
