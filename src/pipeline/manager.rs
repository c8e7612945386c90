/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Pipeline assembly and lifecycle.
//!
//! [`Pipeline`] owns the ring, the sequences and the consumer group threads. Groups
//! are registered while the pipeline is `Created`; [`Pipeline::start`] validates the
//! whole assembly at once, allocates the ring and spawns one thread per group.
//! [`Pipeline::drain`] and [`Pipeline::shutdown`] are the two ways out: the first
//! waits for every published event, the second gives up at a deadline and reports
//! what was left behind.

use super::barrier::SequenceBarrier;
use super::config::PipelineConfig;
use super::error::{ConfigurationError, PipelineError};
use super::error_sink::{ErrorSink, HandlerFailure, logging_sink};
use super::graph::{self, GraphPlan};
use super::group::ConsumerGroup;
use super::health::{
    GroupBacklog, GroupHealth, GroupStatus, PipelineHealth, PipelineState, ShutdownReport,
};
use super::metrics;
use super::processor::{BatchEventProcessor, GroupState};
use super::publisher::Publisher;
use super::ring::RingBuffer;
use super::sequence::INITIAL_SEQUENCE;
use super::sequencer::{ProducerMode, Sequencer};
use crossbeam::utils::Backoff;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Slot factory used to pre-fill the ring at start.
type SlotFactory<E> = Box<dyn FnMut() -> E + Send>;

/// State shared between the pipeline and its publishers.
pub(crate) struct Shared<E> {
    state: AtomicU8,
    pub(crate) core: OnceLock<Core<E>>,
    pub(crate) in_flight: AtomicUsize,
    publisher_issued: AtomicBool,
}

impl<E> Shared<E> {
    #[inline]
    pub(crate) fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    #[inline]
    fn set_state(&self, state: PipelineState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn transition(&self, from: PipelineState, to: PipelineState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Runtime structures allocated by `start()`.
pub(crate) struct Core<E> {
    pub(crate) ring: Arc<RingBuffer<E>>,
    pub(crate) sequencer: Sequencer,
    groups: Vec<Arc<GroupState>>,
    plan: GraphPlan,
    alert: Arc<AtomicBool>,
}

impl<E> Core<E> {
    /// Groups that will never reach the cursor: faulted ones and everything downstream.
    fn stalled_groups(&self) -> HashSet<usize> {
        let mut stalled = HashSet::new();
        for (index, group) in self.groups.iter().enumerate() {
            if group.status() == GroupStatus::Faulted && stalled.insert(index) {
                stalled.extend(self.plan.downstream_of(index));
            }
        }
        stalled
    }

    /// `true` once no publish is in flight and every healthy group reached the cursor.
    fn is_quiescent(&self, in_flight: &AtomicUsize) -> bool {
        if in_flight.load(Ordering::SeqCst) > 0 {
            return false;
        }
        let cursor = self.sequencer.cursor().get();
        let stalled = self.stalled_groups();
        self.groups
            .iter()
            .enumerate()
            .filter(|(index, _)| !stalled.contains(index))
            .all(|(_, group)| group.sequence.get() >= cursor)
    }

    /// Wakes every group thread and tells it to exit.
    fn alert(&self) {
        self.sequencer.close();
        self.alert.store(true, Ordering::Release);
        self.sequencer.wait_strategy().signal_all_when_blocking();
    }
}

struct Registry<E> {
    groups: Vec<ConsumerGroup<E>>,
    error_sink: Option<ErrorSink>,
    factory: SlotFactory<E>,
}

#[derive(Default)]
struct Lifecycle {
    handles: Vec<(String, JoinHandle<()>)>,
    report: Option<ShutdownReport>,
}

/// An in-process event pipeline: one ring, any number of producers, and
/// dependency-ordered consumer groups.
///
/// All methods take `&self`, so a pipeline can be shared (for instance in an
/// `Arc`) between the thread that drives its lifecycle and monitoring code.
///
/// ```
/// use eventring::{ConsumerGroup, Pipeline, PipelineConfig};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let total = Arc::new(AtomicU64::new(0));
/// let pipeline: Pipeline<u64> = Pipeline::new(PipelineConfig::new().with_ring_capacity(64));
///
/// let sum = Arc::clone(&total);
/// pipeline
///     .register(ConsumerGroup::<u64>::new("sum").handle_with(move |event, _, _| {
///         sum.fetch_add(*event, Ordering::Relaxed);
///         Ok(())
///     }))
///     .unwrap();
///
/// pipeline.start().unwrap();
/// let publisher = pipeline.publisher().unwrap();
/// for value in 1..=10 {
///     publisher.publish(value).unwrap();
/// }
/// pipeline.drain();
/// assert_eq!(total.load(Ordering::Relaxed), 55);
/// ```
pub struct Pipeline<E> {
    config: PipelineConfig,
    shared: Arc<Shared<E>>,
    registry: Mutex<Registry<E>>,
    lifecycle: Mutex<Lifecycle>,
    faults: Arc<Mutex<Vec<HandlerFailure>>>,
    force_stop: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Short pause for polling loops.
fn pause(backoff: &Backoff) {
    if backoff.is_completed() {
        thread::sleep(Duration::from_millis(1));
    } else {
        backoff.snooze();
    }
}

impl<E> Pipeline<E>
where
    E: Default + Send + Sync + 'static,
{
    /// Creates a pipeline whose slots start as `E::default()`.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_factory(config, E::default)
    }
}

impl<E> Pipeline<E>
where
    E: Send + Sync + 'static,
{
    /// Creates a pipeline whose slots are pre-filled by `factory` at start.
    pub fn with_factory<F>(config: PipelineConfig, factory: F) -> Self
    where
        F: FnMut() -> E + Send + 'static,
    {
        Self {
            config,
            shared: Arc::new(Shared {
                state: AtomicU8::new(PipelineState::Created.as_u8()),
                core: OnceLock::new(),
                in_flight: AtomicUsize::new(0),
                publisher_issued: AtomicBool::new(false),
            }),
            registry: Mutex::new(Registry {
                groups: Vec::new(),
                error_sink: None,
                factory: Box::new(factory),
            }),
            lifecycle: Mutex::new(Lifecycle::default()),
            faults: Arc::new(Mutex::new(Vec::new())),
            force_stop: AtomicBool::new(false),
        }
    }

    /// Construction options.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    /// Registers a consumer group. Validation is deferred to [`start`](Pipeline::start).
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidState`] once the pipeline has started.
    pub fn register(&self, group: ConsumerGroup<E>) -> Result<(), PipelineError> {
        let mut registry = lock(&self.registry);
        self.require_created("register")?;
        debug!(group = group.name(), upstream = ?group.upstream(), "consumer group registered");
        registry.groups.push(group);
        Ok(())
    }

    /// Replaces the sink receiving handler failures. Defaults to [`logging_sink`].
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidState`] once the pipeline has started.
    pub fn set_error_sink(&self, sink: ErrorSink) -> Result<(), PipelineError> {
        let mut registry = lock(&self.registry);
        self.require_created("set error sink")?;
        registry.error_sink = Some(sink);
        Ok(())
    }

    fn require_created(&self, operation: &'static str) -> Result<(), PipelineError> {
        match self.state() {
            PipelineState::Created => Ok(()),
            state => Err(PipelineError::InvalidState { operation, state }),
        }
    }

    /// Returns a producer handle.
    ///
    /// Handles can be taken before `start()`; they reject events until the pipeline
    /// runs. In [`ProducerMode::Multi`] any number of handles may be taken.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PublisherUnavailable`] on the second call in
    /// [`ProducerMode::Single`].
    pub fn publisher(&self) -> Result<Publisher<E>, PipelineError> {
        if self.config.producer_mode == ProducerMode::Single
            && self.shared.publisher_issued.swap(true, Ordering::SeqCst)
        {
            return Err(PipelineError::PublisherUnavailable);
        }
        Ok(Publisher::new(Arc::clone(&self.shared)))
    }

    /// Validates the assembly, allocates the ring and spawns one thread per group.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidState`] if the pipeline is not `Created`.
    /// - [`PipelineError::Configuration`] for an invalid ring capacity, duplicate
    ///   group names, unknown upstream groups, dependency cycles or empty groups.
    ///   The pipeline stays `Created` and can be fixed and started again.
    /// - [`PipelineError::Spawn`] if a thread cannot be created; the pipeline stops.
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut registry = lock(&self.registry);
        self.require_created("start")?;

        self.config.validate()?;
        if let Some(group) = registry.groups.iter().find(|g| g.handler_count() == 0) {
            return Err(ConfigurationError::EmptyGroup {
                name: group.name().to_string(),
            }
            .into());
        }
        let declared: Vec<(&str, &[String])> = registry
            .groups
            .iter()
            .map(|group| (group.name(), group.upstream()))
            .collect();
        let plan = graph::plan(&declared)?;

        let ring = Arc::new(RingBuffer::new(self.config.ring_capacity, &mut registry.factory)?);
        let states: Vec<Arc<GroupState>> = registry
            .groups
            .iter()
            .map(|group| Arc::new(GroupState::new(group.name().to_string())))
            .collect();
        let wait_strategy = self.config.wait_strategy.build();
        let sequencer = Sequencer::new(
            self.config.ring_capacity,
            self.config.producer_mode,
            plan.terminal
                .iter()
                .map(|&index| Arc::clone(&states[index].sequence))
                .collect(),
            Arc::clone(&wait_strategy),
        );
        let alert = Arc::new(AtomicBool::new(false));
        let error_sink = registry.error_sink.clone().unwrap_or_else(logging_sink);

        let mut pending: Vec<Option<ConsumerGroup<E>>> =
            registry.groups.drain(..).map(Some).collect();
        let mut processors = Vec::with_capacity(pending.len());
        for &index in &plan.order {
            let Some(group) = pending[index].take() else {
                continue;
            };
            let barrier = SequenceBarrier::new(
                sequencer.cursor(),
                plan.upstream[index]
                    .iter()
                    .map(|&upstream| Arc::clone(&states[upstream].sequence))
                    .collect(),
                Arc::clone(&wait_strategy),
                Arc::clone(&alert),
            );
            let policy = group.failure_policy();
            let name = group.name().to_string();
            processors.push((name, BatchEventProcessor::new(
                Arc::clone(&ring),
                barrier,
                Arc::clone(&states[index]),
                group.into_handlers(),
                policy,
                Arc::clone(&error_sink),
                Arc::clone(&self.faults),
            )));
        }

        let core = Core {
            ring,
            sequencer,
            groups: states,
            plan,
            alert,
        };
        let core = self.shared.core.get_or_init(|| core);

        let mut lifecycle = lock(&self.lifecycle);
        for (name, processor) in processors {
            match processor.spawn() {
                Ok(handle) => lifecycle.handles.push((name, handle)),
                Err(err) => {
                    error!("failed to start pipeline: {err}");
                    core.alert();
                    for (_, handle) in lifecycle.handles.drain(..) {
                        let _ = handle.join();
                    }
                    self.shared.set_state(PipelineState::Stopped);
                    return Err(err);
                }
            }
        }

        self.shared.set_state(PipelineState::Started);
        info!(
            groups = core.groups.len(),
            capacity = self.config.ring_capacity,
            wait_strategy = %self.config.wait_strategy,
            "pipeline started"
        );
        Ok(())
    }

    /// Stops accepting events and waits until every published event was processed
    /// by every group that can still make progress, then joins all group threads.
    ///
    /// Groups that faulted under [`FailurePolicy::Halt`](crate::FailurePolicy::Halt),
    /// and groups downstream of them, are not waited for. Calling `drain` on a
    /// stopped pipeline returns immediately; on a pipeline that never started it
    /// simply stops it. A concurrent [`shutdown`](Pipeline::shutdown) cuts the wait short.
    pub fn drain(&self) {
        match self.state() {
            PipelineState::Stopped => return,
            PipelineState::Created => {
                if self.stop_unstarted() {
                    return;
                }
            }
            _ => {}
        }
        let Some(core) = self.shared.core.get() else {
            return;
        };

        if self.shared.transition(PipelineState::Started, PipelineState::Draining) {
            info!(cursor = core.sequencer.cursor().get(), "pipeline draining");
        }
        core.sequencer.close();

        let backoff = Backoff::new();
        while !core.is_quiescent(&self.shared.in_flight) {
            if self.force_stop.load(Ordering::SeqCst) {
                self.await_stopped();
                return;
            }
            pause(&backoff);
        }

        core.alert();
        let mut lifecycle = lock(&self.lifecycle);
        for (name, handle) in lifecycle.handles.drain(..) {
            if handle.join().is_err() {
                error!(group = %name, "consumer group thread panicked");
            }
        }
        if lifecycle.report.is_none() {
            lifecycle.report = Some(ShutdownReport::default());
        }
        self.shared.set_state(PipelineState::Stopped);
        info!(cursor = core.sequencer.cursor().get(), "pipeline drained");
    }

    /// Stops the pipeline within `timeout`, whatever is still outstanding.
    ///
    /// Publishing is rejected immediately. Groups get until the deadline to catch up,
    /// then every waiter is woken and told to exit. Threads still busy inside a
    /// handler at the deadline are detached; they exit after their current event.
    /// Events published but not processed by every group are reported as dropped.
    ///
    /// Repeated calls return the first report. A timeout too large to be
    /// represented as a deadline (such as `Duration::MAX`) waits without limit.
    pub fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        let deadline = Instant::now().checked_add(timeout);
        let expired = || deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if let Some(report) = self.stored_report() {
            return report;
        }
        if self.state() == PipelineState::Created && self.stop_unstarted() {
            return self.stored_report().unwrap_or_default();
        }
        let Some(core) = self.shared.core.get() else {
            return ShutdownReport::default();
        };

        self.force_stop.store(true, Ordering::SeqCst);
        if self.shared.transition(PipelineState::Started, PipelineState::Draining) {
            info!(timeout_ms = timeout.as_millis() as u64, "pipeline shutting down");
        }
        core.sequencer.close();

        let backoff = Backoff::new();
        let mut quiescent = core.is_quiescent(&self.shared.in_flight);
        while !quiescent && !expired() {
            pause(&backoff);
            quiescent = core.is_quiescent(&self.shared.in_flight);
        }

        core.alert();
        let mut lifecycle = lock(&self.lifecycle);
        if let Some(report) = &lifecycle.report {
            return report.clone();
        }

        let mut running = std::mem::take(&mut lifecycle.handles);
        loop {
            let (finished, still_running): (Vec<_>, Vec<_>) =
                running.into_iter().partition(|(_, handle)| handle.is_finished());
            for (name, handle) in finished {
                if handle.join().is_err() {
                    error!(group = %name, "consumer group thread panicked");
                }
            }
            running = still_running;
            if running.is_empty() || expired() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        let detached_groups: Vec<String> = running.into_iter().map(|(name, _)| name).collect();
        if !detached_groups.is_empty() {
            warn!(groups = ?detached_groups, "detached consumer group threads still in a handler");
        }

        let cursor = core.sequencer.cursor().get();
        let groups: Vec<GroupBacklog> = core
            .groups
            .iter()
            .filter_map(|group| {
                let unprocessed = (cursor - group.sequence.get()).max(0) as u64;
                (unprocessed > 0).then(|| GroupBacklog {
                    name: group.name.clone(),
                    unprocessed,
                })
            })
            .collect();
        let report = ShutdownReport {
            dropped_events: groups.iter().map(|g| g.unprocessed).max().unwrap_or(0),
            groups,
            timed_out: !quiescent,
            detached_groups,
        };

        lifecycle.report = Some(report.clone());
        self.shared.set_state(PipelineState::Stopped);
        if report.is_clean() {
            info!(cursor, "pipeline stopped");
        } else {
            warn!(
                cursor,
                dropped = report.dropped_events,
                timed_out = report.timed_out,
                "pipeline stopped with unprocessed events"
            );
        }
        report
    }

    /// Point-in-time progress of the pipeline and every group.
    #[must_use]
    pub fn health(&self) -> PipelineHealth {
        let state = self.state();
        let Some(core) = self.shared.core.get() else {
            let registry = lock(&self.registry);
            return PipelineHealth {
                state,
                cursor: INITIAL_SEQUENCE,
                groups: registry
                    .groups
                    .iter()
                    .map(|group| GroupHealth {
                        name: group.name().to_string(),
                        sequence: INITIAL_SEQUENCE,
                        lag: 0,
                        status: GroupStatus::Pending,
                    })
                    .collect(),
            };
        };

        let cursor = core.sequencer.cursor().get();
        let groups = core
            .groups
            .iter()
            .map(|group| {
                let sequence = group.sequence.get();
                let lag = (cursor - sequence).max(0);
                metrics::record_group_lag(&group.name, lag);
                GroupHealth {
                    name: group.name.clone(),
                    sequence,
                    lag,
                    status: group.status(),
                }
            })
            .collect();
        PipelineHealth {
            state,
            cursor,
            groups,
        }
    }

    /// Failures that halted a group, in the order they happened.
    #[must_use]
    pub fn faults(&self) -> Vec<HandlerFailure> {
        lock(&self.faults).clone()
    }

    /// Moves a never-started pipeline straight to `Stopped`.
    fn stop_unstarted(&self) -> bool {
        let _registry = lock(&self.registry);
        if self.shared.transition(PipelineState::Created, PipelineState::Stopped) {
            lock(&self.lifecycle).report = Some(ShutdownReport::default());
            info!("pipeline stopped before start");
            true
        } else {
            false
        }
    }

    fn stored_report(&self) -> Option<ShutdownReport> {
        lock(&self.lifecycle).report.clone()
    }

    fn await_stopped(&self) {
        let backoff = Backoff::new();
        while self.state() != PipelineState::Stopped {
            pause(&backoff);
        }
    }
}

impl<E> Drop for Pipeline<E> {
    fn drop(&mut self) {
        let state = self.shared.state();
        if matches!(state, PipelineState::Started | PipelineState::Draining) {
            if let Some(core) = self.shared.core.get() {
                core.alert();
            }
            self.shared.set_state(PipelineState::Stopped);
            debug!("running pipeline dropped, consumer group threads signalled to exit");
        }
    }
}

impl<E> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.shared.state())
            .field("config", &self.config)
            .finish()
    }
}
