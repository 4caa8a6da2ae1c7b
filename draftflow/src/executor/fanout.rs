//! Concurrent fan-out across backends.

use futures::future::join_all;
use std::future::Future;

use crate::config::ModelProvider;

/// Calls every provider concurrently and keeps the results that came back.
///
/// All calls are awaited jointly. A failed call never cancels its siblings.
pub async fn fan_out<T, F, Fut>(providers: &[ModelProvider], call: F) -> Vec<T>
where
    F: Fn(ModelProvider) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    join_all(providers.iter().map(|&provider| call(provider)))
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// The provider that handles item `index`: `providers[index % len]`.
#[must_use]
pub fn round_robin(index: usize, providers: &[ModelProvider]) -> Option<ModelProvider> {
    if providers.is_empty() {
        None
    } else {
        Some(providers[index % providers.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ModelProvider::{Deepseek, Kimi, Openai, Qwen};

    #[tokio::test]
    async fn test_fan_out_drops_failures() {
        let results = fan_out(&[Kimi, Qwen, Openai], |p| async move {
            (p != Qwen).then(|| p.as_str().to_string())
        })
        .await;
        assert_eq!(results, vec!["kimi".to_string(), "openai".to_string()]);
    }

    #[tokio::test]
    async fn test_fan_out_runs_concurrently() {
        let start = tokio::time::Instant::now();
        let results = fan_out(&[Kimi, Qwen, Deepseek], |_| async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Some(())
        })
        .await;
        assert_eq!(results.len(), 3);
        assert!(start.elapsed() < std::time::Duration::from_millis(140));
    }

    #[test]
    fn test_round_robin() {
        let providers = [Qwen, Deepseek];
        let assigned: Vec<_> = (0..5).filter_map(|i| round_robin(i, &providers)).collect();
        assert_eq!(assigned, vec![Qwen, Deepseek, Qwen, Deepseek, Qwen]);
        assert_eq!(round_robin(3, &[]), None);
    }
}
