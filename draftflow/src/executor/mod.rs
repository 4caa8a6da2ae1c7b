//! Fan-out and fallback execution over chat backends.
//!
//! Backend errors never leave this module: a failed or malformed candidate
//! is simply absent from the result.

mod backends;
pub mod defaults;
mod fallback;
mod fanout;

pub use backends::Executor;
pub use fallback::first_success;
pub use fanout::{fan_out, round_robin};
