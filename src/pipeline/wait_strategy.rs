//! Pluggable policies for waiting on sequence progress.
//!
//! A wait strategy answers one question: "block the caller until the smallest of
//! these sequences reaches `target`". Consumer groups ask it about the ring cursor
//! or their upstream groups, producers ask it about the terminal groups when the
//! ring is full. Every strategy checks the shared cancellation flag on each wake
//! and returns [`WaitError::Alerted`] once it is raised.
//!
//! | Strategy | Latency | CPU |
//! |----------|---------|-----|
//! | [`BusySpinWaitStrategy`] | lowest | one core per waiter |
//! | [`YieldingWaitStrategy`] | low | high, yields to the scheduler |
//! | [`SleepingWaitStrategy`] | medium | low, backs off to short sleeps |
//! | [`BlockingWaitStrategy`] | highest | lowest, condition variable |

use super::sequence::{Sequence, minimum_sequence};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Reason a wait ended without reaching its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The pipeline raised its cancellation flag.
    #[error("wait cancelled by pipeline shutdown")]
    Alerted,
}

/// Policy controlling how a thread waits for sequences to advance.
pub trait WaitStrategy: Send + Sync + fmt::Debug {
    /// Waits until `min(sequences) >= target` and returns that minimum.
    ///
    /// The returned value may be larger than `target`, which lets consumers
    /// process everything that is already available as one batch. An empty
    /// `sequences` slice never blocks and yields `i64::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Alerted`] as soon as `alert` is observed set.
    fn wait_for(
        &self,
        target: i64,
        sequences: &[Arc<Sequence>],
        alert: &AtomicBool,
    ) -> Result<i64, WaitError>;

    /// Wakes every thread parked inside [`wait_for`](WaitStrategy::wait_for).
    ///
    /// Called after every sequence advance and when the cancellation flag is
    /// raised. Non-blocking strategies ignore it.
    fn signal_all_when_blocking(&self) {}
}

#[inline]
fn is_alerted(alert: &AtomicBool) -> bool {
    alert.load(Ordering::Acquire)
}

/// Busy-loop re-check. Lowest latency, burns a core per waiting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        sequences: &[Arc<Sequence>],
        alert: &AtomicBool,
    ) -> Result<i64, WaitError> {
        loop {
            let available = minimum_sequence(sequences, i64::MAX);
            if available >= target {
                return Ok(available);
            }
            if is_alerted(alert) {
                return Err(WaitError::Alerted);
            }
            std::hint::spin_loop();
        }
    }
}

/// Spins for a fixed number of checks, then yields to the scheduler between checks.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    /// Default number of busy checks before yielding.
    pub const DEFAULT_SPIN_TRIES: u32 = 100;

    /// Creates a strategy that spins `spin_tries` times before yielding.
    pub fn new(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SPIN_TRIES)
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        sequences: &[Arc<Sequence>],
        alert: &AtomicBool,
    ) -> Result<i64, WaitError> {
        let mut counter = self.spin_tries;
        loop {
            let available = minimum_sequence(sequences, i64::MAX);
            if available >= target {
                return Ok(available);
            }
            if is_alerted(alert) {
                return Err(WaitError::Alerted);
            }
            if counter == 0 {
                std::thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }
}

/// Spins, then yields, then sleeps with exponential back-off.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    min_sleep: Duration,
    max_sleep: Duration,
}

impl SleepingWaitStrategy {
    /// Default number of checks before the first sleep.
    pub const DEFAULT_RETRIES: u32 = 200;
    /// Default first sleep.
    pub const DEFAULT_MIN_SLEEP: Duration = Duration::from_micros(1);
    /// Default upper bound of the back-off.
    pub const DEFAULT_MAX_SLEEP: Duration = Duration::from_millis(1);

    /// Creates a strategy with custom back-off bounds.
    ///
    /// The first half of `retries` busy-spins, the second half yields, after
    /// which the thread sleeps starting at `min_sleep`, doubling up to `max_sleep`.
    pub fn new(retries: u32, min_sleep: Duration, max_sleep: Duration) -> Self {
        Self {
            retries,
            min_sleep,
            max_sleep: max_sleep.max(min_sleep),
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_RETRIES,
            Self::DEFAULT_MIN_SLEEP,
            Self::DEFAULT_MAX_SLEEP,
        )
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        sequences: &[Arc<Sequence>],
        alert: &AtomicBool,
    ) -> Result<i64, WaitError> {
        let mut counter = self.retries;
        let mut sleep = self.min_sleep;
        loop {
            let available = minimum_sequence(sequences, i64::MAX);
            if available >= target {
                return Ok(available);
            }
            if is_alerted(alert) {
                return Err(WaitError::Alerted);
            }
            if counter > self.retries / 2 {
                counter -= 1;
                std::hint::spin_loop();
            } else if counter > 0 {
                counter -= 1;
                std::thread::yield_now();
            } else {
                std::thread::sleep(sleep);
                sleep = (sleep * 2).min(self.max_sleep);
            }
        }
    }
}

/// Parks waiters on a condition variable until a sequence advance is signalled.
///
/// Availability is re-checked while holding the lock, and signallers take the
/// same lock before notifying, so an advance between check and park is never lost.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    lock: Mutex<()>,
    condition: Condvar,
}

impl BlockingWaitStrategy {
    /// Creates a blocking strategy.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        sequences: &[Arc<Sequence>],
        alert: &AtomicBool,
    ) -> Result<i64, WaitError> {
        let available = minimum_sequence(sequences, i64::MAX);
        if available >= target {
            return Ok(available);
        }

        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if is_alerted(alert) {
                return Err(WaitError::Alerted);
            }
            let available = minimum_sequence(sequences, i64::MAX);
            if available >= target {
                return Ok(available);
            }
            guard = self
                .condition
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.condition.notify_all();
    }
}

/// Wait strategy selector used by [`PipelineConfig`](crate::PipelineConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategyKind {
    /// [`BlockingWaitStrategy`]
    #[default]
    Blocking,
    /// [`BusySpinWaitStrategy`]
    #[serde(alias = "spin")]
    BusySpin,
    /// [`YieldingWaitStrategy`]
    Yielding,
    /// [`SleepingWaitStrategy`]
    Sleeping,
}

impl WaitStrategyKind {
    /// Instantiates the selected strategy with its default tuning.
    #[must_use]
    pub fn build(self) -> Arc<dyn WaitStrategy> {
        match self {
            WaitStrategyKind::Blocking => Arc::new(BlockingWaitStrategy::new()),
            WaitStrategyKind::BusySpin => Arc::new(BusySpinWaitStrategy),
            WaitStrategyKind::Yielding => Arc::new(YieldingWaitStrategy::default()),
            WaitStrategyKind::Sleeping => Arc::new(SleepingWaitStrategy::default()),
        }
    }
}

impl fmt::Display for WaitStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitStrategyKind::Blocking => "blocking",
            WaitStrategyKind::BusySpin => "busy_spin",
            WaitStrategyKind::Yielding => "yielding",
            WaitStrategyKind::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}
