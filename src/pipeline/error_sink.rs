//! Asynchronous reporting of handler failures.
//!
//! Handler failures never propagate to producers. Each failure is described by a
//! [`HandlerFailure`] and passed to the pipeline's [`ErrorSink`], a callback invoked
//! on the consumer group thread. Three ready-made sinks are provided: a logging
//! sink (the default), a standard library channel and a tokio channel for
//! forwarding failures into async code.

use crate::utils::current_time_millis;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// A single handler failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerFailure {
    /// Group that owns the failing handler
    pub group: String,
    /// Position of the handler inside its group, in registration order
    pub handler_index: usize,
    /// Sequence of the event being handled
    pub sequence: i64,
    /// Error message, or the panic payload when the handler panicked
    pub error: String,
    /// `true` when the handler panicked instead of returning an error
    pub panicked: bool,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl HandlerFailure {
    pub(crate) fn new(
        group: &str,
        handler_index: usize,
        sequence: i64,
        error: String,
        panicked: bool,
    ) -> Self {
        Self {
            group: group.to_string(),
            handler_index,
            sequence,
            error,
            panicked,
            timestamp_ms: current_time_millis(),
        }
    }
}

/// A thread-safe callback receiving handler failures.
///
/// The callback runs on the failing group's thread; slow sinks slow that group down.
pub type ErrorSink = Arc<dyn Fn(&HandlerFailure) + Send + Sync>;

/// Sink that logs every failure through `tracing`. Used when no sink is set.
#[must_use]
pub fn logging_sink() -> ErrorSink {
    Arc::new(|failure: &HandlerFailure| {
        error!(
            group = %failure.group,
            handler = failure.handler_index,
            sequence = failure.sequence,
            panicked = failure.panicked,
            "handler failed: {}",
            failure.error
        );
    })
}

/// Sink forwarding failures into a standard library channel.
#[must_use]
pub fn std_channel_sink() -> (ErrorSink, std::sync::mpsc::Receiver<HandlerFailure>) {
    let (sender, receiver) = std::sync::mpsc::channel();
    let sink: ErrorSink = Arc::new(move |failure: &HandlerFailure| {
        if sender.send(failure.clone()).is_err() {
            warn!(group = %failure.group, sequence = failure.sequence, "failure receiver dropped");
        }
    });
    (sink, receiver)
}

/// Sink forwarding failures into a tokio unbounded channel.
///
/// Sending never blocks, so the sink is safe to call from group threads while the
/// receiver is polled inside a tokio runtime.
#[must_use]
pub fn tokio_channel_sink() -> (ErrorSink, tokio::sync::mpsc::UnboundedReceiver<HandlerFailure>) {
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    let sink: ErrorSink = Arc::new(move |failure: &HandlerFailure| {
        if sender.send(failure.clone()).is_err() {
            warn!(group = %failure.group, sequence = failure.sequence, "failure receiver dropped");
        }
    });
    (sink, receiver)
}
