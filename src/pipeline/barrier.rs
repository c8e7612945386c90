//! Read gate of a consumer group.

use super::sequence::Sequence;
use super::wait_strategy::{WaitError, WaitStrategy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks the sequences a consumer group must stay behind.
///
/// A group without upstream groups trails the ring cursor. A group with upstream
/// groups trails the slowest of them; since every upstream trails the cursor, the
/// cursor does not need to be checked separately.
#[derive(Debug, Clone)]
pub(crate) struct SequenceBarrier {
    dependents: Vec<Arc<Sequence>>,
    wait_strategy: Arc<dyn WaitStrategy>,
    alert: Arc<AtomicBool>,
}

impl SequenceBarrier {
    pub(crate) fn new(
        cursor: &Arc<Sequence>,
        upstream: Vec<Arc<Sequence>>,
        wait_strategy: Arc<dyn WaitStrategy>,
        alert: Arc<AtomicBool>,
    ) -> Self {
        let dependents = if upstream.is_empty() {
            vec![Arc::clone(cursor)]
        } else {
            upstream
        };
        Self {
            dependents,
            wait_strategy,
            alert,
        }
    }

    /// Blocks until `sequence` is readable and returns the highest readable sequence.
    pub(crate) fn wait_for(&self, sequence: i64) -> Result<i64, WaitError> {
        if self.is_alerted() {
            return Err(WaitError::Alerted);
        }
        self.wait_strategy
            .wait_for(sequence, &self.dependents, &self.alert)
    }

    #[inline]
    pub(crate) fn is_alerted(&self) -> bool {
        self.alert.load(Ordering::Acquire)
    }

    /// Wakes waiters after this group advanced its own sequence.
    #[inline]
    pub(crate) fn signal(&self) {
        self.wait_strategy.signal_all_when_blocking();
    }
}
