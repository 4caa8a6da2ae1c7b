//! OpenAI-compatible chat completions client with SSE streaming.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::client::{ChatClient, ChatRequest, ChatResponse, TokenSender};
use super::sse::{token_of, SseEvent, SseLineBuffer};
use crate::config::ModelProvider;
use crate::errors::ChatError;

/// Request timeout for a whole completion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default base URL for backends that speak the OpenAI protocol.
#[must_use]
pub const fn default_base_url(provider: ModelProvider) -> Option<&'static str> {
    match provider {
        ModelProvider::Kimi => Some("https://api.moonshot.cn/v1"),
        ModelProvider::Qwen => Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
        ModelProvider::Glm => Some("https://open.bigmodel.cn/api/paas/v4"),
        ModelProvider::Deepseek => Some("https://api.deepseek.com/v1"),
        ModelProvider::Openai => Some("https://api.openai.com/v1"),
        ModelProvider::Anthropic | ModelProvider::Gemini => None,
    }
}

/// A client for any `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    name: String,
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl OpenAiCompatClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            name: name.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: None,
        })
    }

    /// Pins the model name, overriding the request's.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.is_empty()).then_some(model);
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body(&self, request: &ChatRequest, stream: bool) -> serde_json::Value {
        let mut body = json!({
            "model": self.model.as_deref().unwrap_or(request.model.as_str()),
            "messages": request.messages,
            "stream": stream,
        });
        if request.json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn send(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;
        let response = self
            .http
            .post(self.chat_url())
            .bearer_auth(api_key)
            .json(&self.body(request, stream))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::http(status.as_u16(), body));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let response = self.send(request, false).await?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        let content = token_of(&value).ok_or(ChatError::EmptyResponse)?;
        ChatResponse::for_request(request, content)
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
        tokens: TokenSender,
    ) -> Result<ChatResponse, ChatError> {
        let response = self.send(request, true).await?;
        let mut upstream = response.bytes_stream();
        let mut lines = SseLineBuffer::new();
        let mut full = String::new();

        'read: while let Some(chunk) = upstream.next().await {
            let chunk = chunk.map_err(|e| ChatError::Transport(e.to_string()))?;
            lines.push_chunk(&chunk);
            for event in lines.drain_events() {
                match event {
                    SseEvent::Token(token) => {
                        full.push_str(&token);
                        // A dropped receiver only means nobody is watching.
                        let _ = tokens.send(token);
                    }
                    SseEvent::Done => break 'read,
                }
            }
        }
        if let Some(SseEvent::Token(token)) = lines.finish() {
            full.push_str(&token);
            let _ = tokens.send(token);
        }

        debug!(backend = %self.name, chars = full.len(), "Stream finished");
        if full.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        ChatResponse::for_request(request, full)
    }
}
