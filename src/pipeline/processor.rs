//! Batch event processor: the execution context of one consumer group.

use super::barrier::SequenceBarrier;
use super::error::PipelineError;
use super::error_sink::{ErrorSink, HandlerFailure};
use super::group::FailurePolicy;
use super::handler::EventHandler;
use super::health::GroupStatus;
use super::metrics;
use super::ring::RingBuffer;
use super::sequence::Sequence;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Progress and status of a running group, shared with the pipeline manager.
#[derive(Debug)]
pub(crate) struct GroupState {
    pub(crate) name: String,
    pub(crate) sequence: Arc<Sequence>,
    status: AtomicU8,
}

impl GroupState {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            sequence: Arc::new(Sequence::default()),
            status: AtomicU8::new(GroupStatus::Pending.as_u8()),
        }
    }

    #[inline]
    pub(crate) fn status(&self) -> GroupStatus {
        GroupStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    #[inline]
    fn set_status(&self, status: GroupStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }
}

/// Runs the handlers of one group over the ring, in sequence order.
pub(crate) struct BatchEventProcessor<E> {
    ring: Arc<RingBuffer<E>>,
    barrier: SequenceBarrier,
    state: Arc<GroupState>,
    handlers: Vec<Box<dyn EventHandler<E>>>,
    policy: FailurePolicy,
    error_sink: ErrorSink,
    faults: Arc<Mutex<Vec<HandlerFailure>>>,
}

impl<E> BatchEventProcessor<E>
where
    E: Send + Sync + 'static,
{
    pub(crate) fn new(
        ring: Arc<RingBuffer<E>>,
        barrier: SequenceBarrier,
        state: Arc<GroupState>,
        handlers: Vec<Box<dyn EventHandler<E>>>,
        policy: FailurePolicy,
        error_sink: ErrorSink,
        faults: Arc<Mutex<Vec<HandlerFailure>>>,
    ) -> Self {
        Self {
            ring,
            barrier,
            state,
            handlers,
            policy,
            error_sink,
            faults,
        }
    }

    /// Starts the processor on a dedicated thread named `eventring-<group>`.
    pub(crate) fn spawn(self) -> Result<JoinHandle<()>, PipelineError> {
        let name = self.state.name.clone();
        thread::Builder::new()
            .name(format!("eventring-{name}"))
            .spawn(move || self.run())
            .map_err(|err| PipelineError::Spawn {
                group: name,
                message: err.to_string(),
            })
    }

    fn run(mut self) {
        self.state.set_status(GroupStatus::Running);
        debug!(group = %self.state.name, "consumer group started");
        self.lifecycle_hook("on_start", |handler| handler.on_start());

        let faulted = self.process_events();

        self.lifecycle_hook("on_shutdown", |handler| handler.on_shutdown());
        if !faulted {
            self.state.set_status(GroupStatus::Stopped);
        }
        // Wake anyone gated on this group so they re-check their exit conditions
        self.barrier.signal();
        debug!(
            group = %self.state.name,
            sequence = self.state.sequence.get(),
            "consumer group stopped"
        );
    }

    /// Main loop. Returns `true` if the group stopped because of a fault.
    fn process_events(&mut self) -> bool {
        let ring = Arc::clone(&self.ring);
        let mut next = self.state.sequence.get() + 1;
        loop {
            let available = match self.barrier.wait_for(next) {
                Ok(available) => available,
                Err(_) => return false,
            };

            while next <= available {
                if self.barrier.is_alerted() {
                    self.state.sequence.set(next - 1);
                    return false;
                }

                // SAFETY: `next <= available`, so the slot is published and upstream
                // groups are done with it; producers cannot reclaim it before this
                // group's sequence moves past `next`.
                let event = unsafe { ring.slot(next) };
                let end_of_batch = next == available;

                if !self.dispatch(event, next, end_of_batch) {
                    self.state.sequence.set(next - 1);
                    self.state.set_status(GroupStatus::Faulted);
                    return true;
                }
                next += 1;
            }

            self.state.sequence.set(available);
            self.barrier.signal();
        }
    }

    /// Runs every handler on one event. Returns `false` when the group must halt.
    fn dispatch(&mut self, event: &E, sequence: i64, end_of_batch: bool) -> bool {
        for index in 0..self.handlers.len() {
            let handler = &mut self.handlers[index];
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                handler.on_event(event, sequence, end_of_batch)
            }));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => HandlerFailure::new(
                    &self.state.name,
                    index,
                    sequence,
                    err.message().to_string(),
                    false,
                ),
                Err(payload) => HandlerFailure::new(
                    &self.state.name,
                    index,
                    sequence,
                    panic_message(payload.as_ref()),
                    true,
                ),
            };

            metrics::record_handler_failure(&self.state.name);
            (self.error_sink)(&failure);

            match self.policy {
                FailurePolicy::SkipAndContinue => {
                    warn!(
                        group = %self.state.name,
                        handler = index,
                        sequence,
                        "handler failure skipped"
                    );
                }
                FailurePolicy::Halt => {
                    error!(
                        group = %self.state.name,
                        handler = index,
                        sequence,
                        "consumer group faulted: {}",
                        failure.error
                    );
                    self.faults
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(failure);
                    return false;
                }
            }
        }
        true
    }

    fn lifecycle_hook(&mut self, hook: &str, mut call: impl FnMut(&mut dyn EventHandler<E>)) {
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| call(handler.as_mut()))) {
                error!(
                    group = %self.state.name,
                    handler = index,
                    "{hook} panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
