//! Conversions between fractional epoch seconds and date-times.

use chrono::{DateTime, Utc};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Converts fractional Unix-epoch seconds to a UTC date-time.
///
/// Returns `None` for non-finite input or values outside chrono's range.
pub fn datetime_from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }

    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return None;
    }

    let mut whole = whole as i64;
    let mut nanos = ((secs - secs.floor()) * f64::from(NANOS_PER_SEC)).round() as u32;
    if nanos >= NANOS_PER_SEC {
        whole = whole.checked_add(1)?;
        nanos -= NANOS_PER_SEC;
    }

    DateTime::from_timestamp(whole, nanos)
}

/// Current time as whole seconds since the Unix epoch.
pub fn epoch_seconds_now() -> i64 {
    Utc::now().timestamp()
}
