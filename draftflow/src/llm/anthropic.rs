//! Anthropic messages API client (whole-response only).

use async_trait::async_trait;
use serde_json::json;

use super::client::{ChatClient, ChatRequest, ChatResponse, Role};
use super::openai_compat::DEFAULT_TIMEOUT;
use crate::errors::ChatError;

/// Default API root.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Output token cap sent with every request.
pub const MAX_TOKENS: u32 = 2048;

/// Client for `POST /v1/messages`.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl AnthropicClient {
    /// Creates a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] if the HTTP client cannot be built.
    pub fn new(api_key: Option<String>) -> Result<Self, ChatError> {
        Self::with_base_url(ANTHROPIC_BASE_URL, api_key)
    }

    /// Creates a client against another API root.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: None,
        })
    }

    /// Pins the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.is_empty()).then_some(model);
        self
    }

    fn body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<_> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                json!({
                    "role": m.role,
                    "content": [{ "type": "text", "text": m.content }],
                })
            })
            .collect();
        json!({
            "model": self.model.as_deref().unwrap_or(request.model.as_str()),
            "system": request.system_prompt(),
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "stream": false,
        })
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::http(status.as_u16(), body));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        let content = value
            .pointer("/content/0/text")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(ChatError::EmptyResponse)?;
        ChatResponse::for_request(request, content.to_string())
    }
}
