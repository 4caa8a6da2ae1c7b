//! Utility functions for UUID generation and timestamp handling.

pub mod timestamps;
mod uuid_utils;

pub use timestamps::{format_iso, iso_timestamp, now_millis, now_utc, path_safe, Timestamp};
pub use uuid_utils::{generate_id, generate_uuid};
