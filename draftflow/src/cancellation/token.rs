//! Cancellation token checked at stage boundaries.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::DraftflowError;

/// Reason recorded when cancellation carries none.
pub const DEFAULT_REASON: &str = "cancelled";

/// A token for cooperative cancellation.
///
/// Only the first reason is kept. The pipeline never interrupts a stage in
/// flight; it observes the token through [`CancellationToken::checkpoint`]
/// after each stage.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason. Later calls are ignored.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let reason: String = reason.into();
        *self.reason.write() = Some(if reason.trim().is_empty() {
            DEFAULT_REASON.to_string()
        } else {
            reason
        });
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Fails with [`DraftflowError::Aborted`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns the abort error carrying the first reason.
    pub fn checkpoint(&self) -> Result<(), DraftflowError> {
        if self.is_cancelled() {
            Err(DraftflowError::Aborted(
                self.reason().unwrap_or_else(|| DEFAULT_REASON.to_string()),
            ))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
