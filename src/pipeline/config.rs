//! Pipeline construction options.

use super::error::ConfigurationError;
use super::ring::validate_capacity;
use super::sequencer::ProducerMode;
use super::wait_strategy::WaitStrategyKind;
use serde::{Deserialize, Serialize};

/// Options recognised when building a [`Pipeline`](crate::Pipeline).
///
/// Missing fields take their defaults when deserialized:
///
/// ```
/// use eventring::{PipelineConfig, ProducerMode, WaitStrategyKind};
///
/// let config = PipelineConfig::from_json(r#"{ "ring_capacity": 4096, "wait_strategy": "yielding" }"#)
///     .unwrap();
/// assert_eq!(config.ring_capacity, 4096);
/// assert_eq!(config.wait_strategy, WaitStrategyKind::Yielding);
/// assert_eq!(config.producer_mode, ProducerMode::Multi);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Number of ring slots; a power of two, at least 2.
    pub ring_capacity: usize,
    /// How producers and consumer groups wait for progress.
    pub wait_strategy: WaitStrategyKind,
    /// Single or multiple publishing threads.
    pub producer_mode: ProducerMode,
}

impl PipelineConfig {
    /// Ring capacity used when none is given.
    pub const DEFAULT_RING_CAPACITY: usize = 1024;

    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ring capacity.
    #[must_use]
    pub fn with_ring_capacity(mut self, ring_capacity: usize) -> Self {
        self.ring_capacity = ring_capacity;
        self
    }

    /// Sets the wait strategy.
    #[must_use]
    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyKind) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Sets the producer mode.
    #[must_use]
    pub fn with_producer_mode(mut self, producer_mode: ProducerMode) -> Self {
        self.producer_mode = producer_mode;
        self
    }

    /// Checks the options that can be verified without any consumer group.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRingCapacity`] for a bad ring size.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_capacity(self.ring_capacity)
    }

    /// Parses a JSON document. Unknown fields are rejected, missing ones defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Malformed`] when the document does not parse.
    /// The ring capacity is checked later, by [`Pipeline::start`](crate::Pipeline::start).
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|err| ConfigurationError::Malformed {
            message: err.to_string(),
        })
    }

    /// Serializes the configuration as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; this does not happen for this type.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: Self::DEFAULT_RING_CAPACITY,
            wait_strategy: WaitStrategyKind::default(),
            producer_mode: ProducerMode::default(),
        }
    }
}
