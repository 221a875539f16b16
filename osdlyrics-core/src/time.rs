//! Millisecond conversions for playback timing.
//!
//! Syllable start times are signed milliseconds relative to the moment a line
//! was received, so elapsed time is compared in the same unit.

use std::time::Duration;
use tokio::time::Instant;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as i64, saturating at `i64::MAX`.
    ///
    /// Used when comparing against syllable offsets, which are signed.
    fn as_millis_i64(&self) -> i64;
}

impl DurationExt for Duration {
    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Milliseconds elapsed from `start` to `now`, zero if `now` is earlier.
#[must_use]
pub fn elapsed_millis(start: Instant, now: Instant) -> i64 {
    now.saturating_duration_since(start).as_millis_i64()
}
