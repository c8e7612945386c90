//! Optional instrumentation through the `metrics` facade.
//!
//! Enabled with the `metrics` feature. Without it every function here compiles
//! to nothing, so call sites stay unconditional.
//!
//! | Name | Kind | Labels |
//! |------|------|--------|
//! | `eventring_events_published_total` | counter | |
//! | `eventring_handler_failures_total` | counter | `group` |
//! | `eventring_group_lag` | gauge | `group` |

/// Counts events made visible by a publish call.
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_published(count: u64) {
    ::metrics::counter!("eventring_events_published_total").increment(count);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_published(_count: u64) {}

/// Counts one handler failure in `group`.
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_handler_failure(group: &str) {
    ::metrics::counter!("eventring_handler_failures_total", "group" => group.to_string())
        .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_handler_failure(_group: &str) {}

/// Publishes the current lag of `group`.
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_group_lag(group: &str, lag: i64) {
    ::metrics::gauge!("eventring_group_lag", "group" => group.to_string()).set(lag as f64);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_group_lag(_group: &str, _lag: i64) {}
