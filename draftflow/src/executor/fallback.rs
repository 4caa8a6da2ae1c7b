//! Sequential first-success fallback.

use std::future::Future;
use tracing::debug;

use crate::config::ModelProvider;

/// Tries providers one at a time in list order.
///
/// Returns the first `Some` together with the provider that produced it.
/// Providers after the winner are never called.
pub async fn first_success<T, F, Fut>(
    providers: &[ModelProvider],
    mut call: F,
) -> Option<(ModelProvider, T)>
where
    F: FnMut(ModelProvider) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for &provider in providers {
        if let Some(value) = call(provider).await {
            return Some((provider, value));
        }
        debug!(backend = %provider, "No usable result, trying next backend");
    }
    None
}
