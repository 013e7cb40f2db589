//! Timestamp utilities

use chrono::Utc;

/// Current time as fractional seconds since the Unix epoch.
///
/// Bus payloads carry timestamps in this form.
pub fn epoch_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp_micros() as f64 / 1_000_000.0
}

/// Convert a referee-protocol microsecond timestamp to epoch seconds.
pub fn micros_to_seconds(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}
