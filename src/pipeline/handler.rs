//! Event handler capability registered inside consumer groups.

use std::fmt;
use thiserror::Error;

/// Failure returned by a handler for a single event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with a human readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Outcome of handling one event.
pub type HandlerResult = Result<(), HandlerError>;

/// Processes events delivered to a consumer group.
///
/// A handler is owned by its group's thread and is never called concurrently,
/// so it may keep mutable state (buffers, counters, connections) without locking.
///
/// `end_of_batch` is `true` for the last event of the batch that was available
/// when the group woke up. Handlers that buffer output should flush there.
pub trait EventHandler<E>: Send {
    /// Handles the event published at `sequence`.
    fn on_event(&mut self, event: &E, sequence: i64, end_of_batch: bool) -> HandlerResult;

    /// Called on the group thread before the first event.
    fn on_start(&mut self) {}

    /// Called on the group thread after the last event, when the group exits.
    fn on_shutdown(&mut self) {}
}

/// Adapter turning a closure into an [`EventHandler`].
pub(crate) struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

impl<E, F> EventHandler<E> for FnHandler<F>
where
    F: FnMut(&E, i64, bool) -> HandlerResult + Send,
{
    #[inline]
    fn on_event(&mut self, event: &E, sequence: i64, end_of_batch: bool) -> HandlerResult {
        (self.f)(event, sequence, end_of_batch)
    }
}
