//! Progress publication.
//!
//! The orchestrator hands a deep copy of the run to a [`ProgressSink`] after
//! every stage, and the streaming aggregator does so after every token.

mod sink;

pub use sink::{
    ChannelProgressSink, CollectingProgressSink, LoggingProgressSink, NoOpProgressSink,
    ProgressSink,
};
