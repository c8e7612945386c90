//! Slot claiming and publication for producers.
//!
//! The sequencer owns two counters:
//!
//! - the **claim counter**, the highest sequence handed out to a producer;
//! - the **ring cursor**, the highest sequence visible to consumer groups.
//!
//! A producer claims `n` contiguous sequences, writes their slots, then publishes
//! them by advancing the cursor. Claiming blocks (through the wait strategy) while
//! the claim would overwrite a slot that a terminal consumer group has not
//! processed yet; this is the pipeline's back-pressure.

use super::error::PipelineError;
use super::sequence::{INITIAL_SEQUENCE, Sequence};
use super::wait_strategy::WaitStrategy;
use crossbeam::utils::Backoff;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// How many threads may publish into a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerMode {
    /// Exactly one [`Publisher`](crate::Publisher) exists; claims are plain stores.
    Single,
    /// Any number of publishers claim through a shared atomic counter.
    #[default]
    Multi,
}

/// Claim counter, ring cursor and producer gating.
#[derive(Debug)]
pub(crate) struct Sequencer {
    capacity: i64,
    mode: ProducerMode,
    claimed: Arc<Sequence>,
    cursor: Arc<Sequence>,
    gating: Vec<Arc<Sequence>>,
    wait_strategy: Arc<dyn WaitStrategy>,
    closed: AtomicBool,
}

impl Sequencer {
    /// Creates a sequencer for a ring of `capacity` slots.
    ///
    /// `gating` holds the sequences of every terminal consumer group.
    pub(crate) fn new(
        capacity: usize,
        mode: ProducerMode,
        gating: Vec<Arc<Sequence>>,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Self {
        Self {
            capacity: capacity as i64,
            mode,
            claimed: Arc::new(Sequence::default()),
            cursor: Arc::new(Sequence::default()),
            gating,
            wait_strategy,
            closed: AtomicBool::new(false),
        }
    }

    /// Highest published sequence.
    #[inline]
    pub(crate) fn cursor(&self) -> &Arc<Sequence> {
        &self.cursor
    }

    /// Highest claimed sequence. Equal to the cursor once every claim is published.
    #[inline]
    pub(crate) fn claimed(&self) -> i64 {
        self.claimed.get()
    }

    #[inline]
    pub(crate) fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.wait_strategy
    }

    /// Number of slots that can be claimed right now without waiting.
    pub(crate) fn remaining_capacity(&self) -> i64 {
        let consumed = self
            .gating
            .iter()
            .map(|sequence| sequence.get())
            .min()
            .unwrap_or_else(|| self.claimed());
        self.capacity - (self.claimed() - consumed)
    }

    /// Reserves `n` contiguous sequences and returns them as `start..=end`.
    ///
    /// Blocks while the ring is full relative to the slowest terminal group.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidBatchSize`] when `n == 0` or `n >= capacity`.
    /// - [`PipelineError::Closed`] when the sequencer is closed while waiting.
    pub(crate) fn claim_next(&self, n: usize) -> Result<RangeInclusive<i64>, PipelineError> {
        if n == 0 || n as i64 >= self.capacity {
            return Err(PipelineError::InvalidBatchSize {
                requested: n,
                capacity: self.capacity as usize,
            });
        }
        let n = n as i64;

        match self.mode {
            ProducerMode::Single => {
                let current = self.claimed.get();
                let next = current + n;
                self.wait_for_capacity(next)?;
                self.claimed.set(next);
                trace!("claimed sequences {}..={}", current + 1, next);
                Ok(current + 1..=next)
            }
            ProducerMode::Multi => {
                let backoff = Backoff::new();
                loop {
                    let current = self.claimed.get();
                    let next = current + n;
                    self.wait_for_capacity(next)?;
                    if self.claimed.compare_and_swap(current, next) {
                        trace!("claimed sequences {}..={}", current + 1, next);
                        return Ok(current + 1..=next);
                    }
                    backoff.spin();
                }
            }
        }
    }

    /// Waits until claiming up to `end` cannot overwrite an unprocessed slot.
    fn wait_for_capacity(&self, end: i64) -> Result<(), PipelineError> {
        let wrap_point = end - self.capacity;
        if wrap_point <= INITIAL_SEQUENCE {
            return Ok(());
        }
        self.wait_strategy
            .wait_for(wrap_point, &self.gating, &self.closed)
            .map(|_| ())
            .map_err(|_| PipelineError::Closed)
    }

    /// Makes `range` visible to consumer groups.
    ///
    /// In multi-producer mode the cursor advances in claim order: this waits until
    /// every earlier claim has been published.
    pub(crate) fn publish(&self, range: RangeInclusive<i64>) {
        let (start, end) = range.into_inner();
        match self.mode {
            ProducerMode::Single => self.cursor.set(end),
            ProducerMode::Multi => {
                let backoff = Backoff::new();
                while !self.cursor.compare_and_swap(start - 1, end) {
                    backoff.snooze();
                }
            }
        }
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Stops admitting claims. Producers blocked on a full ring return
    /// [`PipelineError::Closed`]; claims already granted can still be published.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::wait_strategy::{BlockingWaitStrategy, BusySpinWaitStrategy};
    use std::thread;
    use std::time::Duration;

    fn sequencer(capacity: usize, mode: ProducerMode, gating: Vec<Arc<Sequence>>) -> Sequencer {
        Sequencer::new(capacity, mode, gating, Arc::new(BlockingWaitStrategy::new()))
    }

    #[test]
    fn test_claim_rejects_invalid_sizes() {
        let sequencer = sequencer(8, ProducerMode::Multi, Vec::new());
        assert!(matches!(
            sequencer.claim_next(0),
            Err(PipelineError::InvalidBatchSize { requested: 0, capacity: 8 })
        ));
        assert!(matches!(
            sequencer.claim_next(8),
            Err(PipelineError::InvalidBatchSize { requested: 8, capacity: 8 })
        ));
        assert_eq!(sequencer.claim_next(7).unwrap(), 0..=6);
    }

    #[test]
    fn test_claims_are_contiguous() {
        for mode in [ProducerMode::Single, ProducerMode::Multi] {
            let sequencer = sequencer(16, mode, Vec::new());
            assert_eq!(sequencer.claim_next(1).unwrap(), 0..=0);
            assert_eq!(sequencer.claim_next(3).unwrap(), 1..=3);
            assert_eq!(sequencer.claimed(), 3);
            assert_eq!(sequencer.cursor().get(), INITIAL_SEQUENCE);
        }
    }

    #[test]
    fn test_publish_advances_cursor() {
        let sequencer = sequencer(8, ProducerMode::Multi, Vec::new());
        let range = sequencer.claim_next(2).unwrap();
        sequencer.publish(range);
        assert_eq!(sequencer.cursor().get(), 1);
    }

    #[test]
    fn test_multi_publish_follows_claim_order() {
        let sequencer = Arc::new(sequencer(8, ProducerMode::Multi, Vec::new()));
        let first = sequencer.claim_next(1).unwrap();
        let second = sequencer.claim_next(1).unwrap();

        let late = {
            let sequencer = Arc::clone(&sequencer);
            thread::spawn(move || sequencer.publish(second))
        };
        thread::sleep(Duration::from_millis(20));
        // The second claim cannot become visible before the first
        assert_eq!(sequencer.cursor().get(), INITIAL_SEQUENCE);

        sequencer.publish(first);
        late.join().unwrap();
        assert_eq!(sequencer.cursor().get(), 1);
    }

    #[test]
    fn test_claim_blocks_until_gating_advances() {
        let consumer = Arc::new(Sequence::default());
        let sequencer = Arc::new(sequencer(4, ProducerMode::Single, vec![Arc::clone(&consumer)]));

        let range = sequencer.claim_next(3).unwrap();
        sequencer.publish(range);
        let range = sequencer.claim_next(1).unwrap();
        sequencer.publish(range);
        assert_eq!(sequencer.remaining_capacity(), 0);

        let producer = {
            let sequencer = Arc::clone(&sequencer);
            thread::spawn(move || sequencer.claim_next(1))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());

        consumer.set(0);
        sequencer.wait_strategy().signal_all_when_blocking();
        assert_eq!(producer.join().unwrap().unwrap(), 4..=4);
    }

    #[test]
    fn test_close_releases_blocked_producer() {
        let consumer = Arc::new(Sequence::default());
        let sequencer = Arc::new(Sequencer::new(
            2,
            ProducerMode::Multi,
            vec![consumer],
            Arc::new(BusySpinWaitStrategy),
        ));
        let range = sequencer.claim_next(1).unwrap();
        sequencer.publish(range);
        let range = sequencer.claim_next(1).unwrap();
        sequencer.publish(range);

        let producer = {
            let sequencer = Arc::clone(&sequencer);
            thread::spawn(move || sequencer.claim_next(1))
        };
        thread::sleep(Duration::from_millis(10));
        sequencer.close();
        assert!(matches!(producer.join().unwrap(), Err(PipelineError::Closed)));
        assert!(sequencer.is_closed());
    }

    #[test]
    fn test_ungated_producer_never_blocks() {
        let sequencer = sequencer(2, ProducerMode::Single, Vec::new());
        for expected in 0..10 {
            let range = sequencer.claim_next(1).unwrap();
            assert_eq!(range, expected..=expected);
            sequencer.publish(range);
        }
    }
}
