//! Scripted collaborators for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ChatError;
use crate::llm::{ChatClient, ChatRequest, ChatResponse, TokenSender};

/// What a scripted client answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A whole text response.
    Text(String),
    /// A JSON value, rendered as text.
    Json(serde_json::Value),
    /// Token increments. Non-streaming calls get them concatenated.
    Stream(Vec<String>),
    /// Token increments followed by a transport failure.
    StreamThenFail(Vec<String>),
    /// A failure.
    Fail(ChatError),
}

impl Reply {
    /// A text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A streamed reply.
    #[must_use]
    pub fn stream<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream(tokens.into_iter().map(Into::into).collect())
    }
}

/// A [`ChatClient`] that answers from a script and records every call.
///
/// Replies are chosen by the first rule whose key occurs in the request's
/// system prompt; rules registered with [`ScriptedChatClient::once`] are
/// consumed in order before the permanent ones.
#[derive(Debug)]
pub struct ScriptedChatClient {
    name: String,
    streaming: bool,
    once: Mutex<VecDeque<(String, Reply)>>,
    rules: Mutex<Vec<(String, Reply)>>,
    fallback: Mutex<Option<Reply>>,
    calls: Mutex<Vec<ChatRequest>>,
    call_count: AtomicUsize,
}

impl ScriptedChatClient {
    /// Creates a client that fails every call with `EmptyResponse`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            streaming: false,
            once: Mutex::new(VecDeque::new()),
            rules: Mutex::new(Vec::new()),
            fallback: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Marks the client as streaming-capable.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Answers `reply` whenever the system prompt contains `key`.
    #[must_use]
    pub fn on(self, key: impl Into<String>, reply: Reply) -> Self {
        self.rules.lock().push((key.into(), reply));
        self
    }

    /// Answers `reply` once, the next time the system prompt contains `key`.
    #[must_use]
    pub fn once(self, key: impl Into<String>, reply: Reply) -> Self {
        self.once.lock().push_back((key.into(), reply));
        self
    }

    /// Answers `reply` when no rule matches.
    #[must_use]
    pub fn otherwise(self, reply: Reply) -> Self {
        *self.fallback.lock() = Some(reply);
        self
    }

    /// Total number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of calls whose system prompt contains `key`.
    #[must_use]
    pub fn calls_matching(&self, key: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.system_prompt().is_some_and(|s| s.contains(key)))
            .count()
    }

    /// Every recorded request.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.calls.lock().clone()
    }

    fn next_reply(&self, request: &ChatRequest) -> Option<Reply> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(request.clone());
        let system = request.system_prompt().unwrap_or_default();

        let mut once = self.once.lock();
        if let Some(pos) = once.iter().position(|(key, _)| system.contains(key.as_str())) {
            return once.remove(pos).map(|(_, reply)| reply);
        }
        drop(once);

        self.rules
            .lock()
            .iter()
            .find(|(key, _)| system.contains(key.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.fallback.lock().clone())
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let content = match self.next_reply(request) {
            Some(Reply::Text(text)) => text,
            Some(Reply::Json(value)) => value.to_string(),
            Some(Reply::Stream(tokens)) => tokens.concat(),
            Some(Reply::StreamThenFail(_)) => {
                return Err(ChatError::Transport("stream interrupted".to_string()))
            }
            Some(Reply::Fail(err)) => return Err(err),
            None => return Err(ChatError::EmptyResponse),
        };
        ChatResponse::for_request(request, content)
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
        tokens: TokenSender,
    ) -> Result<ChatResponse, ChatError> {
        let (increments, fail) = match self.next_reply(request) {
            Some(Reply::Stream(t)) => (t, false),
            Some(Reply::StreamThenFail(t)) => (t, true),
            Some(Reply::Text(text)) => (vec![text], false),
            Some(Reply::Json(value)) => (vec![value.to_string()], false),
            Some(Reply::Fail(err)) => return Err(err),
            None => return Err(ChatError::EmptyResponse),
        };
        let mut full = String::new();
        for token in increments {
            full.push_str(&token);
            let _ = tokens.send(token);
            tokio::task::yield_now().await;
        }
        if fail {
            return Err(ChatError::Transport("stream interrupted".to_string()));
        }
        ChatResponse::for_request(request, full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::token_channel;
    use serde_json::json;

    fn request(system: &str) -> ChatRequest {
        ChatRequest::new("m", system, "u")
    }

    #[tokio::test]
    async fn test_rules_and_fallback() {
        let client = ScriptedChatClient::new("qwen")
            .on("outline", Reply::Json(json!({"title": "T"})))
            .otherwise(Reply::text("default"));

        let res = client.chat(&request("outline-multi").json()).await.unwrap();
        assert_eq!(res.data, Some(json!({"title": "T"})));
        let res = client.chat(&request("other")).await.unwrap();
        assert_eq!(res.content, "default");
        assert_eq!(client.call_count(), 2);
        assert_eq!(client.calls_matching("outline"), 1);
    }

    #[tokio::test]
    async fn test_once_consumed_first() {
        let client = ScriptedChatClient::new("kimi")
            .once("x", Reply::Fail(ChatError::http(500, "boom")))
            .on("x", Reply::text("ok"));
        assert!(client.chat(&request("x")).await.is_err());
        assert_eq!(client.chat(&request("x")).await.unwrap().content, "ok");
    }

    #[tokio::test]
    async fn test_unscripted_call_fails() {
        let client = ScriptedChatClient::new("glm");
        assert_eq!(
            client.chat(&request("x")).await.unwrap_err(),
            ChatError::EmptyResponse
        );
    }

    #[tokio::test]
    async fn test_stream_sends_tokens() {
        let client = ScriptedChatClient::new("qwen")
            .streaming()
            .on("final", Reply::stream(["a", "b"]));
        let (tx, mut rx) = token_channel();
        let res = client.chat_stream(&request("final"), tx).await.unwrap();
        assert_eq!(res.content, "ab");
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
    }
}
