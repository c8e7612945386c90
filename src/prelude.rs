/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! This module provides a convenient way to import the most commonly used
//! types, traits, and functions from the eventring-rs crate. Instead of
//! importing each type individually, you can use:
//!
//! ```rust
//! use eventring::prelude::*;
//! ```
//!
//! This will import all the essential types needed for building a pipeline.

// Pipeline assembly and lifecycle
pub use crate::pipeline::{Pipeline, PipelineConfig, Publisher};
pub use crate::pipeline::{PipelineHealth, PipelineState, ShutdownReport};

// Consumer groups and handlers
pub use crate::pipeline::{ConsumerGroup, EventHandler, FailurePolicy, HandlerError, HandlerResult};

// Failure reporting
pub use crate::pipeline::{
    ErrorSink, HandlerFailure, logging_sink, std_channel_sink, tokio_channel_sink,
};

// Producer and waiting policies
pub use crate::pipeline::{ProducerMode, WaitStrategyKind};

// Errors
pub use crate::pipeline::{ConfigurationError, PipelineError};
