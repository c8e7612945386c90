//! Atomic sequence counters used to coordinate producers and consumer groups.
//!
//! Every position in the pipeline is tracked by a [`Sequence`]: the ring cursor
//! (highest published event), the claim counter (highest reserved slot) and one
//! sequence per consumer group (highest event fully processed by that group).
//!
//! `set` is a release store and `get` an acquire load. A writer that fills a slot
//! and then `set`s a sequence guarantees that any reader who observes the new value
//! through `get` also observes the slot contents.

use crossbeam::utils::CachePadded;
use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Value of every sequence before anything has been published or consumed.
pub const INITIAL_SEQUENCE: i64 = -1;

/// A cache-line padded, monotonically increasing 64-bit position tracker.
///
/// Each sequence has a single logical writer (the publisher path for the ring
/// cursor, the owning group thread for a group sequence) and any number of readers.
#[derive(Debug)]
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

impl Sequence {
    /// Creates a sequence holding `value`.
    pub fn new(value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(value)),
        }
    }

    /// Reads the current value with acquire ordering.
    #[must_use]
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Stores `value` with release ordering.
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Atomically replaces `current` with `next`.
    ///
    /// Returns `true` if the value was `current` and has been replaced.
    #[inline]
    pub fn compare_and_swap(&self, current: i64, next: i64) -> bool {
        self.value
            .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Adds `delta` and returns the previous value.
    #[inline]
    pub fn fetch_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel)
    }

    /// Raises the value to `value` if it is currently lower. Returns the previous value.
    #[inline]
    pub fn fetch_max(&self, value: i64) -> i64 {
        self.value.fetch_max(value, Ordering::AcqRel)
    }
}

impl PartialEq<i64> for Sequence {
    fn eq(&self, other: &i64) -> bool {
        self.get() == *other
    }
}

impl PartialOrd<i64> for Sequence {
    fn partial_cmp(&self, other: &i64) -> Option<CmpOrdering> {
        Some(self.get().cmp(other))
    }
}

/// Returns the smallest value among `sequences`, or `default` when the slice is empty.
#[must_use]
#[inline]
pub fn minimum_sequence(sequences: &[Arc<Sequence>], default: i64) -> i64 {
    sequences
        .iter()
        .map(|sequence| sequence.get())
        .min()
        .unwrap_or(default)
}
