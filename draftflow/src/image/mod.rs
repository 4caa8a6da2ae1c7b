//! Image generation: credential resolution, request signing, response
//! extraction, placeholders and the signed HTTP backend.
//!
//! Callers never see an image error. [`resolve_images`] turns every failure
//! into the inline placeholder for that prompt.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::ImageError;
use crate::model::{GeneratedImage, ImagePrompt};

pub mod credentials;
pub mod extract;
pub mod placeholder;
pub mod signer;
pub mod sizing;

#[cfg(feature = "http")]
pub mod adapter;

pub use credentials::{resolve as resolve_credentials, CredentialSource, Credentials};
pub use placeholder::placeholder_data_uri;
pub use sizing::{normalize_size, DEFAULT_SIZE};

#[cfg(feature = "http")]
pub use adapter::JimengImageBackend;

/// A backend that turns a prompt into an image URL.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Backend identity for logs and node data.
    fn name(&self) -> &str;

    /// Generates one image.
    async fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<String, ImageError>;
}

/// Resolves one URL per prompt, one job at a time.
///
/// Without a backend, or when a job fails, the prompt gets the placeholder
/// image for its title.
pub async fn resolve_images(
    backend: Option<&dyn ImageBackend>,
    prompts: &[ImagePrompt],
) -> Vec<GeneratedImage> {
    let size = normalize_size(DEFAULT_SIZE);
    let mut images = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        let url = match backend {
            Some(backend) => match backend.generate(&prompt.prompt, size, size).await {
                Ok(url) => {
                    info!(backend = backend.name(), section = %prompt.section_id, "Image generated");
                    url
                }
                Err(e) => {
                    warn!(backend = backend.name(), section = %prompt.section_id, error = %e, "Image failed, using placeholder");
                    placeholder_data_uri(&prompt.title)
                }
            },
            None => placeholder_data_uri(&prompt.title),
        };
        images.push(prompt.clone().into_image(url));
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FlakyBackend {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<String, ImageError> {
            assert_eq!((width, height), (1024, 1024));
            self.calls.lock().push(prompt.to_string());
            if prompt.contains("fail") {
                Err(ImageError::Exhausted(20))
            } else {
                Ok(format!("https://img/{prompt}.png"))
            }
        }
    }

    fn prompts() -> Vec<ImagePrompt> {
        vec![
            ImagePrompt::new("s1", "Intro", "ok"),
            ImagePrompt::new("s2", "Details", "fail"),
        ]
    }

    #[tokio::test]
    async fn test_without_backend_all_placeholders() {
        let images = resolve_images(None, &prompts()).await;
        assert_eq!(images.len(), 2);
        assert!(images
            .iter()
            .all(|i| i.url.starts_with("data:image/svg+xml;utf8,")));
    }

    #[tokio::test]
    async fn test_failures_fall_back_per_prompt() {
        let backend = FlakyBackend {
            calls: Mutex::new(Vec::new()),
        };
        let images = resolve_images(Some(&backend), &prompts()).await;
        assert_eq!(images[0].url, "https://img/ok.png");
        assert_eq!(images[1].url, placeholder_data_uri("Details"));
        assert_eq!(*backend.calls.lock(), vec!["ok".to_string(), "fail".to_string()]);
    }
}
