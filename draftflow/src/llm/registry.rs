//! Maps configured backends to chat clients.

use std::collections::HashMap;
use std::sync::Arc;

use super::client::ChatClient;
use crate::config::ModelProvider;

/// The set of chat clients a run can call.
///
/// A backend without a client is still selectable; calls to it fail with
/// [`crate::errors::ChatError::NoClient`] and fall through to the next
/// candidate.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<ModelProvider, Arc<dyn ChatClient>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client for a backend, replacing any previous one.
    #[must_use]
    pub fn with_client(mut self, provider: ModelProvider, client: Arc<dyn ChatClient>) -> Self {
        self.insert(provider, client);
        self
    }

    /// Registers a client for a backend.
    pub fn insert(&mut self, provider: ModelProvider, client: Arc<dyn ChatClient>) {
        self.clients.insert(provider, client);
    }

    /// Returns the client for a backend.
    #[must_use]
    pub fn get(&self, provider: ModelProvider) -> Option<Arc<dyn ChatClient>> {
        self.clients.get(&provider).cloned()
    }

    /// Returns true if a client is registered.
    #[must_use]
    pub fn contains(&self, provider: ModelProvider) -> bool {
        self.clients.contains_key(&provider)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.clients.keys().map(ModelProvider::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ClientRegistry").field("clients", &names).finish()
    }
}

#[cfg(feature = "http")]
impl ClientRegistry {
    /// Builds HTTP clients for every backend that has an API key.
    ///
    /// OpenAI-compatible backends use their default base URL unless the
    /// config overrides it. Anthropic uses the messages API. Gemini has no
    /// client.
    #[must_use]
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        use super::anthropic::{AnthropicClient, ANTHROPIC_BASE_URL};
        use super::openai_compat::{default_base_url, OpenAiCompatClient};
        use tracing::{debug, warn};

        let mut registry = Self::new();
        for (provider, settings) in &config.providers {
            let Some(api_key) = settings.api_key().map(str::to_string) else {
                debug!(backend = %provider, "No API key, no client");
                continue;
            };
            let model = settings.model.clone().unwrap_or_default();

            let built = if *provider == ModelProvider::Anthropic {
                let base = settings.base_url.as_deref().unwrap_or(ANTHROPIC_BASE_URL);
                AnthropicClient::with_base_url(base, Some(api_key))
                    .map(|c| Arc::new(c.with_model(model)) as Arc<dyn ChatClient>)
            } else if let Some(base) = settings
                .base_url
                .as_deref()
                .or_else(|| default_base_url(*provider))
            {
                OpenAiCompatClient::new(provider.as_str(), base, Some(api_key))
                    .map(|c| Arc::new(c.with_model(model)) as Arc<dyn ChatClient>)
            } else {
                debug!(backend = %provider, "No protocol for backend, no client");
                continue;
            };

            match built {
                Ok(client) => registry.insert(*provider, client),
                Err(e) => warn!(backend = %provider, error = %e, "Failed to build client"),
            }
        }
        registry
    }
}
