//! Pipeline error types

use super::health::PipelineState;
use thiserror::Error;

/// Invalid pipeline assembly, detected by [`Pipeline::start`](crate::Pipeline::start).
///
/// Configuration errors are fatal and never retried: the pipeline stays in
/// [`PipelineState::Created`] until the assembly is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Ring capacity is not a power of two, or is smaller than 2.
    #[error("invalid ring capacity {capacity}: must be a power of two and at least 2")]
    InvalidRingCapacity {
        /// The rejected capacity
        capacity: usize,
    },

    /// Two consumer groups were registered under the same name.
    #[error("duplicate consumer group name: {name}")]
    DuplicateGroup {
        /// The repeated group name
        name: String,
    },

    /// A group declares an upstream group that was never registered.
    #[error("consumer group {group} depends on unknown group {dependency}")]
    UnknownDependency {
        /// The group declaring the dependency
        group: String,
        /// The missing upstream group
        dependency: String,
    },

    /// The group dependency graph contains a cycle.
    #[error("cyclic consumer group dependency: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Group names along the cycle; the first name is repeated at the end
        cycle: Vec<String>,
    },

    /// A group was registered without any handler.
    #[error("consumer group {name} has no handlers")]
    EmptyGroup {
        /// The empty group
        name: String,
    },

    /// A configuration document could not be parsed.
    #[error("malformed pipeline configuration: {message}")]
    Malformed {
        /// Parser error message
        message: String,
    },
}

/// Errors returned by pipeline and publisher operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The pipeline assembly is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The operation is not allowed in the current lifecycle state.
    #[error("cannot {operation} while pipeline is {state}")]
    InvalidState {
        /// The rejected operation
        operation: &'static str,
        /// The state the pipeline was in
        state: PipelineState,
    },

    /// Publishing was attempted before `start()`.
    #[error("pipeline has not been started")]
    NotStarted,

    /// The pipeline is draining or stopped; the caller should stop producing.
    #[error("pipeline is closed")]
    Closed,

    /// A claim asked for zero slots or for at least the ring capacity.
    #[error("invalid batch size {requested}: must be between 1 and {} for a ring of {capacity}", .capacity.saturating_sub(1))]
    InvalidBatchSize {
        /// Number of slots requested
        requested: usize,
        /// Ring capacity
        capacity: usize,
    },

    /// A single-producer pipeline already handed out its publisher.
    #[error("single-producer pipeline already has a publisher")]
    PublisherUnavailable,

    /// The execution context of a consumer group could not be spawned.
    #[error("failed to spawn consumer group {group}: {message}")]
    Spawn {
        /// The group whose thread failed to start
        group: String,
        /// OS error message
        message: String,
    },
}

impl PipelineError {
    /// Returns `true` for errors that only mean "stop producing".
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, PipelineError::Closed)
    }
}
