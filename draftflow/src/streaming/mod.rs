//! Incremental publication of the final document.

mod aggregator;

pub use aggregator::{StreamOutcome, StreamingAggregator};
