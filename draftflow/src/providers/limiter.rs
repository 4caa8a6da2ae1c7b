//! Per-backend concurrency limiter.

use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hard upper bound on simultaneous calls to one backend.
pub const MAX_PERMITS_PER_BACKEND: usize = 2;

/// Maps a backend identity to a semaphore.
///
/// Semaphores are created lazily on first use and kept for the life of the
/// limiter, so the permit count is fixed by whichever caller came first.
#[derive(Debug, Default)]
pub struct BackendLimiter {
    semaphores: DashMap<String, Arc<Semaphore>>,
}

impl BackendLimiter {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide limiter shared by every run.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<BackendLimiter>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Permit count for a requested concurrency: `min(2, max(1, n))`.
    #[must_use]
    pub fn permits_for(concurrency: usize) -> usize {
        concurrency.clamp(1, MAX_PERMITS_PER_BACKEND)
    }

    /// Returns the semaphore for `backend`, creating it if needed.
    pub fn semaphore(&self, backend: &str, concurrency: usize) -> Arc<Semaphore> {
        self.semaphores
            .entry(backend.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(Self::permits_for(concurrency))))
            .clone()
    }

    /// Waits for a permit for `backend`.
    ///
    /// Returns `None` only if the semaphore was closed, which never happens
    /// for semaphores owned by the limiter.
    pub async fn acquire(&self, backend: &str, concurrency: usize) -> Option<OwnedSemaphorePermit> {
        self.semaphore(backend, concurrency).acquire_owned().await.ok()
    }

    /// Number of backends seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.semaphores.len()
    }

    /// Returns true if no backend has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.semaphores.is_empty()
    }
}
