//! Signed, asynchronously polled text-to-image client.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::credentials::Credentials;
use super::extract::{self, PollOutcome};
use super::signer::{self, Action, VISUAL_HOST};
use super::ImageBackend;
use crate::errors::ImageError;

/// Request key used when `VOLC_JIMENG_REQ_KEY` is unset.
pub const DEFAULT_REQ_KEY: &str = "jimeng_t2i_v40";
/// Environment variable overriding the request key.
pub const REQ_KEY_ENV: &str = "VOLC_JIMENG_REQ_KEY";
/// Delay between polls, and before retrying a throttled poll.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1200);
/// Poll attempts before giving up.
pub const MAX_POLL_ATTEMPTS: usize = 20;

/// Request key from the environment, or the default.
#[must_use]
pub fn req_key_from_env() -> String {
    std::env::var(REQ_KEY_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REQ_KEY.to_string())
}

/// Client for the Volcengine Jimeng text-to-image API.
#[derive(Debug, Clone)]
pub struct JimengImageBackend {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    req_key: String,
    poll_interval: Duration,
    max_attempts: usize,
}

impl JimengImageBackend {
    /// Creates a client against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Transport`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, ImageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ImageError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("https://{VISUAL_HOST}"),
            credentials,
            req_key: req_key_from_env(),
            poll_interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        })
    }

    /// Points the client at another endpoint root.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the request key.
    #[must_use]
    pub fn with_req_key(mut self, req_key: impl Into<String>) -> Self {
        self.req_key = req_key.into();
        self
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the attempt limit.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    async fn post(&self, action: Action, body: &Value) -> Result<reqwest::Response, ImageError> {
        let body = body.to_string();
        let headers = signer::sign(&self.credentials, action, &body, Utc::now());
        let mut request = self
            .http
            .post(format!("{}/?{}", self.endpoint, action.query()))
            .body(body);
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }
        request
            .send()
            .await
            .map_err(|e| ImageError::Transport(e.to_string()))
    }

    /// Submits a task and returns its id.
    async fn submit(&self, prompt: &str, width: u32, height: u32) -> Result<String, ImageError> {
        let body = json!({
            "req_key": self.req_key,
            "prompt": prompt,
            "width": width,
            "height": height,
            "return_url": true,
        });
        let response = self.post(Action::SubmitTask, &body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Http {
                phase: "submit",
                status: status.as_u16(),
            });
        }
        let value: Value = response.json().await.unwrap_or(Value::Null);
        extract::task_id(&value).ok_or_else(|| ImageError::MissingTaskId(value.to_string()))
    }

    /// Polls a task until it yields an image, ends, or attempts run out.
    async fn poll(&self, task_id: &str) -> Result<String, ImageError> {
        let body = json!({
            "req_key": self.req_key,
            "task_id": task_id,
            "req_json": json!({ "return_url": true }).to_string(),
        });

        for attempt in 1..=self.max_attempts {
            let response = self.post(Action::GetResult, &body).await?;
            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                debug!(task_id, attempt, status = status.as_u16(), "Throttled poll, retrying");
            } else if !status.is_success() {
                return Err(ImageError::Http {
                    phase: "get",
                    status: status.as_u16(),
                });
            } else {
                let value: Value = response.json().await.unwrap_or(Value::Null);
                match extract::poll_outcome(&value) {
                    PollOutcome::Ready(url) => return Ok(url),
                    PollOutcome::Terminal(state) => return Err(ImageError::TerminalStatus(state)),
                    PollOutcome::Pending => debug!(task_id, attempt, "Task pending"),
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Err(ImageError::Exhausted(self.max_attempts))
    }
}

#[async_trait]
impl ImageBackend for JimengImageBackend {
    fn name(&self) -> &str {
        "jimeng"
    }

    async fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<String, ImageError> {
        let task_id = self.submit(prompt, width, height).await?;
        debug!(task_id = %task_id, "Image task submitted");
        let result = self.poll(&task_id).await;
        if let Err(e) = &result {
            warn!(task_id = %task_id, error = %e, "Image task produced no URL");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let backend = JimengImageBackend::new(Credentials::new("ak", "sk"))
            .unwrap()
            .with_endpoint("http://127.0.0.1:1234/")
            .with_req_key("custom")
            .with_max_attempts(3)
            .with_poll_interval(Duration::from_millis(5));
        assert_eq!(backend.endpoint, "http://127.0.0.1:1234");
        assert_eq!(backend.req_key, "custom");
        assert_eq!(backend.max_attempts, 3);
        assert_eq!(backend.name(), "jimeng");
    }

    #[test]
    fn test_default_endpoint() {
        let backend = JimengImageBackend::new(Credentials::new("ak", "sk")).unwrap();
        assert_eq!(backend.endpoint, "https://visual.volcengineapi.com");
        assert_eq!(backend.poll_interval, POLL_INTERVAL);
    }
}
