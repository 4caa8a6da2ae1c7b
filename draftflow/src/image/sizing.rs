//! Output size normalization.

/// Sizes the backend accepts.
pub const ALLOWED_SIZES: [u32; 4] = [1024, 1280, 1536, 2048];

/// Smallest and largest size after rounding.
pub const MIN_SIZE: u32 = 64;
/// See [`MIN_SIZE`].
pub const MAX_SIZE: u32 = 2048;

/// Default width and height.
pub const DEFAULT_SIZE: u32 = 1024;

/// Rounds to the nearest multiple of 64, clamps to [64, 2048], then rounds
/// up to the first allowed size.
#[must_use]
pub fn normalize_size(requested: u32) -> u32 {
    let rounded = requested.saturating_add(32) / 64 * 64;
    let clamped = rounded.clamp(MIN_SIZE, MAX_SIZE);
    ALLOWED_SIZES
        .iter()
        .copied()
        .find(|s| *s >= clamped)
        .unwrap_or(MAX_SIZE)
}
