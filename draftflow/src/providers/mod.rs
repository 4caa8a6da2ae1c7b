//! Backend selection and per-backend rate limiting.

mod limiter;
mod selector;

pub use limiter::{BackendLimiter, MAX_PERMITS_PER_BACKEND};
pub use selector::{selected, selected_image};
