//! Structured logging setup and stage timing.

use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Returns false when a
/// subscriber was already installed, which is not an error.
pub fn init_logging(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).compact())
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    result.is_ok()
}

/// A span carrying the run id for everything logged inside it.
#[must_use]
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::span!(Level::INFO, "run", run_id = %run_id)
}

/// Wall-clock timer for one stage.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
    stage: &'static str,
}

impl StageTimer {
    /// Starts timing `stage` and logs the start.
    #[must_use]
    pub fn start(run_id: &str, stage: &'static str) -> Self {
        info!(run_id = %run_id, stage, "Stage started");
        Self {
            start: Instant::now(),
            stage,
        }
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The stage name.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Logs completion and returns the duration in milliseconds.
    pub fn finish(self, run_id: &str) -> f64 {
        let duration_ms = self.elapsed_ms();
        info!(run_id = %run_id, stage = self.stage, duration_ms, "Stage finished");
        duration_ms
    }
}
