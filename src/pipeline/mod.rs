//! Disruptor-style event pipeline: ring, sequences, wait strategies, publishers and consumer groups.

mod barrier;
/// Pipeline construction options.
pub mod config;
pub mod error;
/// Handler failure reporting.
pub mod error_sink;
mod graph;
pub mod group;
pub mod handler;
/// Lifecycle state and observability snapshots.
pub mod health;
/// Pipeline assembly and lifecycle.
pub mod manager;
mod metrics;
mod processor;
pub mod publisher;
pub mod ring;
pub mod sequence;
pub mod sequencer;
/// Pluggable waiting policies.
pub mod wait_strategy;

pub use config::PipelineConfig;
pub use error::{ConfigurationError, PipelineError};
pub use error_sink::{
    ErrorSink, HandlerFailure, logging_sink, std_channel_sink, tokio_channel_sink,
};
pub use group::{ConsumerGroup, FailurePolicy};
pub use handler::{EventHandler, HandlerError, HandlerResult};
pub use health::{
    GroupBacklog, GroupHealth, GroupStatus, PipelineHealth, PipelineState, ShutdownReport,
};
pub use manager::Pipeline;
pub use publisher::Publisher;
pub use ring::RingBuffer;
pub use sequence::{INITIAL_SEQUENCE, Sequence, minimum_sequence};
pub use sequencer::ProducerMode;
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, WaitError, WaitStrategy,
    WaitStrategyKind, YieldingWaitStrategy,
};
