//! Observability utilities.

mod tracing;

pub use self::tracing::{init_logging, run_span, LogFormat, StageTimer, DEFAULT_FILTER};
