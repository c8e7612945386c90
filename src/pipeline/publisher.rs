//! Producer handle.

use super::error::PipelineError;
use super::health::PipelineState;
use super::manager::{Core, Shared};
use super::metrics;
use super::sequencer::Sequencer;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Publishes events into a [`Pipeline`](crate::Pipeline).
///
/// Every call claims ring slots, writes them and advances the ring cursor exactly
/// once before returning. Calls block while the ring is full relative to the
/// slowest terminal consumer group.
///
/// A publisher is `Send` and may outlive the pipeline; once the pipeline drains,
/// shuts down or is dropped every call fails with [`PipelineError::Closed`].
///
/// A publisher is not `Sync`: each producing thread owns its own handle. In
/// [`ProducerMode::Single`](crate::ProducerMode::Single) claims are unsynchronized
/// stores, so the single handle must never be used from two threads at once.
///
/// ```compile_fail
/// fn shared_between_threads<T: Sync>() {}
/// shared_between_threads::<eventring::Publisher<u64>>();
/// ```
pub struct Publisher<E> {
    shared: Arc<Shared<E>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<E> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("state", &self.shared.state())
            .finish()
    }
}

/// Marks a publish call as in flight for the duration of its claim and publish.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Publishes a claimed range when dropped, even if writing a slot panicked.
struct PublishGuard<'a> {
    sequencer: &'a Sequencer,
    range: RangeInclusive<i64>,
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.sequencer.publish(self.range.clone());
    }
}

impl<E> Publisher<E>
where
    E: Send + Sync + 'static,
{
    pub(crate) fn new(shared: Arc<Shared<E>>) -> Self {
        Self {
            shared,
            _not_sync: PhantomData,
        }
    }

    /// Admits a publish call if the pipeline is running.
    fn enter(&self) -> Result<(&Core<E>, InFlight<'_>), PipelineError> {
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = InFlight(&self.shared.in_flight);
        match self.shared.state() {
            PipelineState::Created => Err(PipelineError::NotStarted),
            PipelineState::Started => self
                .shared
                .core
                .get()
                .map(|core| (core, in_flight))
                .ok_or(PipelineError::NotStarted),
            PipelineState::Draining | PipelineState::Stopped => Err(PipelineError::Closed),
        }
    }

    /// Moves `event` into the next slot and publishes it. Returns its sequence.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotStarted`] before `start()`, [`PipelineError::Closed`]
    /// once the pipeline stops accepting events.
    pub fn publish(&self, event: E) -> Result<i64, PipelineError> {
        self.publish_with(move |slot, _| *slot = event)
    }

    /// Publishes by mutating the next slot in place.
    ///
    /// The closure receives the slot (still holding the event from the previous
    /// lap, or the factory value) and its sequence. Reusing the slot's buffers
    /// avoids allocating per event.
    ///
    /// # Errors
    ///
    /// Same as [`publish`](Publisher::publish).
    pub fn publish_with<F>(&self, write: F) -> Result<i64, PipelineError>
    where
        F: FnOnce(&mut E, i64),
    {
        let (core, _in_flight) = self.enter()?;
        let range = core.sequencer.claim_next(1)?;
        let sequence = *range.start();
        {
            let _guard = PublishGuard {
                sequencer: &core.sequencer,
                range,
            };
            // SAFETY: the claim on `sequence` is exclusive until the guard publishes it.
            write(unsafe { core.ring.slot_mut(sequence) }, sequence);
        }
        metrics::record_published(1);
        Ok(sequence)
    }

    /// Publishes a batch with a single claim and a single cursor advance.
    ///
    /// Returns the sequences assigned to the batch, in iteration order.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidBatchSize`] for an empty batch or one that does not
    /// fit in the ring (`len >= capacity`), plus the errors of
    /// [`publish`](Publisher::publish).
    ///
    /// # Panics
    ///
    /// In debug builds, if the iterator yields a different number of items than
    /// its `len()` reported. The claimed range is still published.
    pub fn publish_batch<I>(&self, events: I) -> Result<RangeInclusive<i64>, PipelineError>
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: ExactSizeIterator,
    {
        let mut events = events.into_iter();
        let (core, _in_flight) = self.enter()?;
        let range = core.sequencer.claim_next(events.len())?;
        {
            let _guard = PublishGuard {
                sequencer: &core.sequencer,
                range: range.clone(),
            };
            let claimed = range.end() - range.start() + 1;
            let mut written = 0i64;
            for sequence in range.clone() {
                let Some(event) = events.next() else {
                    break;
                };
                // SAFETY: the whole range is claimed by this call until the guard publishes it.
                unsafe { *core.ring.slot_mut(sequence) = event };
                written += 1;
            }
            debug_assert!(
                written == claimed && events.next().is_none(),
                "batch iterator reported {claimed} items but yielded a different count"
            );
        }
        metrics::record_published((range.end() - range.start() + 1) as u64);
        Ok(range)
    }

    /// Highest published sequence, or `-1` before the first publish.
    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.shared
            .core
            .get()
            .map_or(super::sequence::INITIAL_SEQUENCE, |core| {
                core.sequencer.cursor().get()
            })
    }

    /// Slots that can be claimed right now without waiting, `None` before start.
    #[must_use]
    pub fn remaining_capacity(&self) -> Option<i64> {
        self.shared
            .core
            .get()
            .map(|core| core.sequencer.remaining_capacity())
    }

    /// `true` once publishing can no longer succeed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self.shared.state(),
            PipelineState::Draining | PipelineState::Stopped
        )
    }
}
