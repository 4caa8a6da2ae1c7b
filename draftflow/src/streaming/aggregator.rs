//! Token fold for the final-merge stage.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ModelProvider;
use crate::core::RunState;
use crate::events::ProgressSink;
use crate::executor::Executor;
use crate::llm::{token_channel, ChatRequest, TokenReceiver};
use crate::model::FinalDoc;

/// The accepted final-merge text and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Backend whose answer was accepted.
    pub provider: ModelProvider,
    /// Full concatenated response.
    pub markdown: String,
    /// Whether the answer arrived as token increments.
    pub streamed: bool,
    /// Snapshots published while folding tokens.
    pub publications: usize,
}

/// Folds token increments into a growing final document.
///
/// The aggregator owns the buffer. Each increment produces a fresh copy of
/// the base run with the buffer as `final` and the current node's data
/// updated, handed to the sink.
pub struct StreamingAggregator<'a> {
    executor: &'a Executor,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl<'a> StreamingAggregator<'a> {
    /// Creates an aggregator publishing to `sink`.
    #[must_use]
    pub fn new(executor: &'a Executor, sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self { executor, sink }
    }

    /// Tries `providers` in order and returns the first non-blank answer.
    ///
    /// A backend that fails mid-stream is abandoned; the next one starts
    /// from an empty buffer.
    pub async fn run(
        &self,
        providers: &[ModelProvider],
        system: &str,
        user: &str,
        base: &RunState,
    ) -> Option<StreamOutcome> {
        for &provider in providers {
            let Some(client) = self.executor.client(provider) else {
                debug!(backend = %provider, "No client for final merge");
                continue;
            };
            let request = self.executor.request(provider, system, user);

            let outcome = if client.supports_streaming() {
                self.streamed(provider, &request, base).await
            } else {
                self.whole(provider, &request).await
            };
            if outcome.is_some() {
                return outcome;
            }
        }
        None
    }

    async fn whole(&self, provider: ModelProvider, request: &ChatRequest) -> Option<StreamOutcome> {
        match self.executor.ask(provider, request).await {
            Ok(res) if !res.content.trim().is_empty() => Some(StreamOutcome {
                provider,
                markdown: res.content,
                streamed: false,
                publications: 0,
            }),
            Ok(_) => {
                debug!(backend = %provider, "Blank final merge");
                None
            }
            Err(e) => {
                debug!(backend = %provider, error = %e, "Final merge failed");
                None
            }
        }
    }

    async fn streamed(
        &self,
        provider: ModelProvider,
        request: &ChatRequest,
        base: &RunState,
    ) -> Option<StreamOutcome> {
        let (tx, rx) = token_channel();
        let call = self.executor.ask_stream(provider, request, tx);
        let fold = self.fold(provider, rx, base);
        let (result, (buffer, publications)) = tokio::join!(call, fold);

        match result {
            Ok(res) => {
                let markdown = if res.content.trim().is_empty() {
                    buffer
                } else {
                    res.content
                };
                if markdown.trim().is_empty() {
                    debug!(backend = %provider, "Blank streamed final merge");
                    return None;
                }
                Some(StreamOutcome {
                    provider,
                    markdown,
                    streamed: true,
                    publications,
                })
            }
            Err(e) => {
                warn!(backend = %provider, error = %e, received = buffer.len(), "Stream failed, discarding partial output");
                None
            }
        }
    }

    async fn fold(
        &self,
        provider: ModelProvider,
        mut rx: TokenReceiver,
        base: &RunState,
    ) -> (String, usize) {
        let mut buffer = String::new();
        let mut publications = 0;
        while let Some(token) = rx.recv().await {
            buffer.push_str(&token);
            if let Some(sink) = &self.sink {
                sink.publish(snapshot_with(base, provider, &buffer)).await;
                publications += 1;
            }
        }
        (buffer, publications)
    }
}

fn snapshot_with(base: &RunState, provider: ModelProvider, buffer: &str) -> RunState {
    let mut snapshot = base.clone();
    snapshot.final_doc = Some(FinalDoc::new(buffer));
    if let Some(node) = snapshot.nodes.last_mut() {
        node.data = Some(json!({
            "provider": provider,
            "streaming": true,
            "chars": buffer.chars().count(),
        }));
    }
    snapshot
}
