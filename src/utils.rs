use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, or `0` if the system clock is before it.
///
/// Internal to the crate; failure records expose the value as `timestamp_ms`.
///
/// ```compile_fail
/// let _ = eventring::current_time_millis();
/// ```
#[must_use]
pub(crate) fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
