//! Cooperative cancellation for pipeline runs.

mod token;

pub use token::{CancellationToken, DEFAULT_REASON};
