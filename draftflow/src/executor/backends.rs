//! Rate-limited calls to chat backends.

use std::sync::Arc;
use tracing::debug;

use crate::config::{AppConfig, ModelProvider};
use crate::errors::ChatError;
use crate::llm::{ChatClient, ChatRequest, ChatResponse, ClientRegistry, TokenSender};
use crate::providers::BackendLimiter;

/// Issues chat requests against the registered clients.
///
/// Every call holds a permit from the per-backend limiter for its whole
/// duration. Failures are logged at debug level and surface as `None` from
/// the `ask_*` helpers.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<ClientRegistry>,
    config: Arc<AppConfig>,
    limiter: Arc<BackendLimiter>,
}

impl Executor {
    /// Creates an executor sharing the process-wide limiter.
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>, config: Arc<AppConfig>) -> Self {
        Self {
            registry,
            config,
            limiter: BackendLimiter::global(),
        }
    }

    /// Uses a private limiter instead of the process-wide one.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<BackendLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// The configuration snapshot this executor was built with.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The client registered for `provider`.
    #[must_use]
    pub fn client(&self, provider: ModelProvider) -> Option<Arc<dyn ChatClient>> {
        self.registry.get(provider)
    }

    /// Builds a request for `provider` using its configured model.
    #[must_use]
    pub fn request(&self, provider: ModelProvider, system: &str, user: &str) -> ChatRequest {
        ChatRequest::new(self.config.model_of(provider), system, user)
    }

    /// Sends one request to `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoClient`] when no client is registered, or the
    /// client's own error.
    pub async fn ask(
        &self,
        provider: ModelProvider,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        let client = self
            .client(provider)
            .ok_or_else(|| ChatError::NoClient(provider.to_string()))?;
        let _permit = self
            .limiter
            .acquire(provider.as_str(), self.config.concurrency)
            .await;
        client.chat(request).await
    }

    /// Streams one request to `provider`, forwarding token increments.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::ask`].
    pub async fn ask_stream(
        &self,
        provider: ModelProvider,
        request: &ChatRequest,
        tokens: TokenSender,
    ) -> Result<ChatResponse, ChatError> {
        let client = self
            .client(provider)
            .ok_or_else(|| ChatError::NoClient(provider.to_string()))?;
        let _permit = self
            .limiter
            .acquire(provider.as_str(), self.config.concurrency)
            .await;
        client.chat_stream(request, tokens).await
    }

    /// Asks for JSON; `None` on any failure.
    pub async fn ask_json(
        &self,
        provider: ModelProvider,
        system: &str,
        user: &str,
    ) -> Option<serde_json::Value> {
        let request = self.request(provider, system, user).json();
        match self.ask(provider, &request).await {
            Ok(ChatResponse { data: Some(data), .. }) if !data.is_null() => Some(data),
            Ok(_) => {
                debug!(backend = %provider, "Backend returned no JSON");
                None
            }
            Err(e) => {
                debug!(backend = %provider, error = ?e.to_dict(), "Backend call failed");
                None
            }
        }
    }

    /// Asks for text; `None` on failure or blank content.
    pub async fn ask_text(&self, provider: ModelProvider, system: &str, user: &str) -> Option<String> {
        let request = self.request(provider, system, user);
        match self.ask(provider, &request).await {
            Ok(res) if !res.content.trim().is_empty() => Some(res.content),
            Ok(_) => {
                debug!(backend = %provider, "Backend returned blank text");
                None
            }
            Err(e) => {
                debug!(backend = %provider, error = ?e.to_dict(), "Backend call failed");
                None
            }
        }
    }
}
