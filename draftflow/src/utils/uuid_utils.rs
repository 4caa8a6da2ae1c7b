//! UUID generation helpers.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a new UUID v4 rendered as a hyphenated string.
#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
