//! Conversion of 1601-epoch tick counts to calendar time.
//!
//! Registry blobs store timestamps as the number of 100-nanosecond
//! intervals since 1601-01-01T00:00:00 UTC.

use chrono::{DateTime, Utc};

/// Seconds between 1601-01-01 and 1970-01-01.
pub const EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Number of 100ns ticks in one second.
pub const TICKS_PER_SEC: u64 = 10_000_000;

/// Converts a 1601-epoch tick count to a UTC timestamp.
///
/// Returns `None` for zeroed fields and for anything that lands before the
/// Unix epoch once adjusted. Never panics.
pub fn ticks_to_time(ticks: u64) -> Option<DateTime<Utc>> {
    if ticks == 0 {
        return None;
    }

    // u64::MAX / TICKS_PER_SEC fits comfortably in i64
    let secs = i64::try_from(ticks / TICKS_PER_SEC).ok()?;
    let nanos = u32::try_from((ticks % TICKS_PER_SEC) * 100).ok()?;

    let unix_secs = secs.checked_sub(EPOCH_OFFSET_SECS)?;
    if unix_secs < 0 {
        tracing::trace!(ticks, "Timestamp predates the Unix epoch, treating as absent");
        return None;
    }

    DateTime::from_timestamp(unix_secs, nanos)
}
