//! Fixed-capacity slot arena shared by producers and consumer groups.
//!
//! `RingBuffer` is an `UnsafeCell`-based circular array whose slots are created
//! once and then reused forever. The ring provides no synchronization of its own:
//! every access is coordinated by the sequence protocol of the sequencer and the
//! group barriers.

use super::error::ConfigurationError;
use std::cell::UnsafeCell;
use std::fmt;

/// A power-of-two sized circular array of reusable event slots.
///
/// # Safety
///
/// `Send` and `Sync` are implemented manually and rely on these conventions:
///
/// 1. **Single writer per claim**: a slot is written only by the producer that
///    claimed its sequence, between claim and publish.
/// 2. **Readers after publish**: consumer groups read a slot only after the ring
///    cursor has been advanced past its sequence.
/// 3. **No early reuse**: a slot is claimed for the next lap only after every
///    terminal consumer group has moved past its previous occupant.
pub struct RingBuffer<E> {
    slots: Box<[UnsafeCell<E>]>,
    index_mask: usize,
}

// SAFETY: slot access is serialized by the external sequence protocol described above.
// Moving `E` across threads requires `Send`, sharing `&E` between groups requires `Sync`.
unsafe impl<E: Send + Sync> Send for RingBuffer<E> {}
unsafe impl<E: Send + Sync> Sync for RingBuffer<E> {}

impl<E> fmt::Debug for RingBuffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.slots.len())
            .finish()
    }
}

impl<E> RingBuffer<E> {
    /// Allocates `capacity` slots, each initialised by `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRingCapacity`] if `capacity` is not a
    /// power of two or is smaller than 2.
    pub fn new<F>(capacity: usize, mut factory: F) -> Result<Self, ConfigurationError>
    where
        F: FnMut() -> E,
    {
        validate_capacity(capacity)?;

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(factory()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            index_mask: capacity - 1,
        })
    }

    /// Total number of slots.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maps a sequence to its slot index (`sequence & (capacity - 1)`).
    #[must_use]
    #[inline]
    pub fn index_of(&self, sequence: i64) -> usize {
        (sequence as usize) & self.index_mask
    }

    /// Raw pointer to the slot that holds `sequence`.
    #[inline]
    fn slot_ptr(&self, sequence: i64) -> *mut E {
        let index = self.index_of(sequence);
        // SAFETY: `index_mask` keeps `index` inside `slots`.
        unsafe { self.slots.get_unchecked(index).get() }
    }

    /// Shared view of the slot holding `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must have observed the ring cursor at or past `sequence` and
    /// must not hold the reference past its own group sequence advance.
    #[inline]
    pub(crate) unsafe fn slot(&self, sequence: i64) -> &E {
        // SAFETY: upheld by the caller, see above.
        unsafe { &*self.slot_ptr(sequence) }
    }

    /// Exclusive view of the slot holding `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must own the claim for `sequence` and the claim must not be
    /// published yet.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub(crate) unsafe fn slot_mut(&self, sequence: i64) -> &mut E {
        // SAFETY: upheld by the caller, see above.
        unsafe { &mut *self.slot_ptr(sequence) }
    }
}

/// Checks the ring capacity rules shared by the ring and the pipeline configuration.
pub(crate) fn validate_capacity(capacity: usize) -> Result<(), ConfigurationError> {
    if capacity < 2 || !capacity.is_power_of_two() {
        return Err(ConfigurationError::InvalidRingCapacity { capacity });
    }
    Ok(())
}
