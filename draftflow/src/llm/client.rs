//! The chat capability every text backend exposes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::ChatError;

/// Channel end a streaming client pushes token increments into.
pub type TokenSender = mpsc::UnboundedSender<String>;

/// Channel end the streaming aggregator folds over.
pub type TokenReceiver = mpsc::UnboundedReceiver<String>;

/// Creates a token channel.
#[must_use]
pub fn token_channel() -> (TokenSender, TokenReceiver) {
    mpsc::unbounded_channel()
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// End-user content.
    User,
    /// Model output.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name. Clients prefer their configured model over this.
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// Ask for a JSON object and parse the content.
    #[serde(default)]
    pub json: bool,
}

impl ChatRequest {
    /// Creates a request from a system prompt and a user payload.
    #[must_use]
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::system(system), Message::user(user)],
            json: false,
        }
    }

    /// Requests JSON output.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// The system prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }
}

/// A chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Full text content.
    pub content: String,
    /// Parsed content when the request asked for JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ChatResponse {
    /// A plain text response.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            data: None,
        }
    }

    /// Builds the response for `request`, parsing JSON when asked.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Parse`] when JSON was requested and the content
    /// is not valid JSON.
    pub fn for_request(request: &ChatRequest, content: String) -> Result<Self, ChatError> {
        if request.json {
            let data = parse_json_content(&content)?;
            Ok(Self {
                content,
                data: Some(data),
            })
        } else {
            Ok(Self::text(content))
        }
    }
}

/// Parses model output as JSON, tolerating a surrounding markdown fence.
///
/// # Errors
///
/// Returns [`ChatError::Parse`] if the content is not valid JSON.
pub fn parse_json_content(content: &str) -> Result<serde_json::Value, ChatError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| ChatError::Parse(e.to_string()))
}

/// A text-generation backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Backend identity, used for logging and rate limiting.
    fn name(&self) -> &str;

    /// Whether [`ChatClient::chat_stream`] emits token increments.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Sends a request and waits for the whole response.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;

    /// Sends a request, pushing token increments into `tokens` as they arrive.
    ///
    /// The returned response carries the full concatenated content. Clients
    /// without streaming support fall back to [`ChatClient::chat`] and send
    /// nothing on the channel.
    async fn chat_stream(
        &self,
        request: &ChatRequest,
        tokens: TokenSender,
    ) -> Result<ChatResponse, ChatError> {
        drop(tokens);
        self.chat(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let req = ChatRequest::new("m", "sys", "user").json();
        assert!(req.json);
        assert_eq!(req.system_prompt(), Some("sys"));
        assert_eq!(req.messages[1].role, Role::User);
        let value = serde_json::to_value(&req.messages[0]).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "sys"}));
    }

    #[test]
    fn test_parse_json_content_plain_and_fenced() {
        assert_eq!(parse_json_content(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            parse_json_content("```json\n{\"a\":2}\n```").unwrap(),
            json!({"a": 2})
        );
        assert_eq!(parse_json_content("```\n[1]\n```").unwrap(), json!([1]));
        assert!(matches!(
            parse_json_content("not json"),
            Err(ChatError::Parse(_))
        ));
    }

    #[test]
    fn test_for_request_parses_only_json_requests() {
        let text = ChatRequest::new("m", "s", "u");
        let res = ChatResponse::for_request(&text, "hello".to_string()).unwrap();
        assert!(res.data.is_none());

        let json_req = text.json();
        assert!(ChatResponse::for_request(&json_req, "hello".to_string()).is_err());
        let res = ChatResponse::for_request(&json_req, "{}".to_string()).unwrap();
        assert_eq!(res.data, Some(json!({})));
    }
}
