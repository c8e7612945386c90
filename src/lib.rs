//! # Low-Latency In-Process Event Pipeline
//!
//! A disruptor-style event pipeline written in Rust. Producers publish events into a
//! pre-allocated ring of reusable slots; independent consumer groups read them in
//! publish order, each on its own thread, optionally trailing other groups. The hot
//! path allocates nothing per event and takes no lock.
//!
//! ## Key Features
//!
//! - **Pre-allocated Ring**: A power-of-two array of slots created once at start and
//!   reused forever. Slots are addressed by `sequence & (capacity - 1)`.
//!
//! - **Lock-Free Coordination**: Producers and consumers coordinate only through
//!   cache-padded atomic sequences with release/acquire ordering.
//!
//! - **Single and Multi Producer**: A single publisher claims with plain stores;
//!   multiple publishers claim through a shared atomic counter and publish in claim order.
//!
//! - **Consumer Group Chains**: Groups declare upstream groups and form a DAG. A group
//!   never processes an event before all of its upstream groups did.
//!
//! - **Back-Pressure**: Producers slow down to the speed of the slowest terminal group
//!   instead of overwriting unprocessed slots.
//!
//! - **Pluggable Wait Strategies**: Blocking, busy-spin, yielding and sleeping.
//!
//! - **Explicit Failure Policy**: Per group, handler failures are either reported and
//!   skipped, or halt the group and mark it faulted.
//!
//! - **Bounded Shutdown**: `shutdown(timeout)` never blocks past its deadline and reports
//!   how many published events were left unprocessed.
//!
//! ## Design Goals
//!
//! 1. **Ordering**: Every group sees every event exactly once, in publish order.
//! 2. **Latency**: No allocation and no lock between publish and handler call.
//! 3. **Predictability**: Memory use is fixed at start; back-pressure replaces unbounded queues.
//! 4. **Clarity**: Configuration errors surface at `start()`, handler errors through a sink.
//!
//! ## Use Cases
//!
//! - **Trading Systems**: Journal, replicate and apply order flow in strict sequence
//! - **Telemetry Fan-Out**: Feed several independent sinks from one hot producer
//! - **Staged Processing**: Decode, enrich and persist as chained consumer groups
//!
//! ## Lifecycle
//!
//! A [`Pipeline`] moves through `Created -> Started -> Draining -> Stopped`:
//!
//! | Call | Effect |
//! |------|--------|
//! | [`Pipeline::register`] | Adds a consumer group (only while `Created`) |
//! | [`Pipeline::start`] | Validates the group graph and spawns one thread per group |
//! | [`Pipeline::drain`] | Rejects new events, waits for every group, joins threads |
//! | [`Pipeline::shutdown`] | Rejects new events, waits until a deadline, reports dropped events |
//! | [`Pipeline::health`] | Cursor, state and per-group lag |
//!
//! ## Example
//!
//! ```rust
//! use eventring::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! let journal = Arc::new(Mutex::new(Vec::new()));
//! let replicated = Arc::new(Mutex::new(Vec::new()));
//!
//! let pipeline: Pipeline<u64> = Pipeline::new(
//!     PipelineConfig::new()
//!         .with_ring_capacity(256)
//!         .with_wait_strategy(WaitStrategyKind::Yielding),
//! );
//!
//! let sink = Arc::clone(&journal);
//! pipeline
//!     .register(ConsumerGroup::<u64>::new("journal").handle_with(move |event, _, _| {
//!         sink.lock().unwrap().push(*event);
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let sink = Arc::clone(&replicated);
//! pipeline
//!     .register(
//!         ConsumerGroup::<u64>::new("replicate")
//!             .after("journal")
//!             .handle_with(move |event, _, _| {
//!                 sink.lock().unwrap().push(*event);
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! pipeline.start().unwrap();
//! let publisher = pipeline.publisher().unwrap();
//! publisher.publish_batch([1, 2, 3]).unwrap();
//! publisher.publish(4).unwrap();
//! pipeline.drain();
//!
//! assert_eq!(*journal.lock().unwrap(), vec![1, 2, 3, 4]);
//! assert_eq!(*replicated.lock().unwrap(), vec![1, 2, 3, 4]);
//! ```
//!
//! ## Handler Failures
//!
//! Handlers return [`HandlerResult`]. Errors and panics are turned into
//! [`HandlerFailure`] records and passed to the pipeline's [`ErrorSink`]
//! ([`logging_sink`] by default, or [`std_channel_sink`] / [`tokio_channel_sink`]).
//! Under [`FailurePolicy::SkipAndContinue`] the group moves on; under
//! [`FailurePolicy::Halt`] it stops and is reported as faulted by [`Pipeline::health`]
//! and [`Pipeline::faults`].
//!
//! ## Feature Flags
//!
//! - `metrics`: publishes counters and lag gauges through the `metrics` facade.
//!
//! ## Status
//!
//! This project is currently in active development and is not yet suitable for production use.

pub mod pipeline;

/// Prelude module that re-exports commonly used types and traits.
pub mod prelude;
mod utils;

pub use pipeline::{
    BlockingWaitStrategy, BusySpinWaitStrategy, ConfigurationError, ConsumerGroup, ErrorSink,
    EventHandler, FailurePolicy, GroupBacklog, GroupHealth, GroupStatus, HandlerError,
    HandlerFailure, HandlerResult, INITIAL_SEQUENCE, Pipeline, PipelineConfig, PipelineError,
    PipelineHealth, PipelineState, ProducerMode, Publisher, RingBuffer, Sequence,
    ShutdownReport, SleepingWaitStrategy, WaitError, WaitStrategy, WaitStrategyKind,
    YieldingWaitStrategy, logging_sink, minimum_sequence, std_channel_sink, tokio_channel_sink,
};
