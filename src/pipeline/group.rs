//! Consumer group declarations.

use super::handler::{EventHandler, FnHandler, HandlerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a group does when one of its handlers fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure to the error sink and keep going: the remaining
    /// handlers still see the event and the group moves on to the next one.
    #[default]
    SkipAndContinue,
    /// Report the failure, mark the group faulted and stop its thread.
    ///
    /// The group sequence stays at the last fully processed event, so a faulted
    /// terminal group eventually blocks producers once the ring wraps.
    Halt,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::SkipAndContinue => f.write_str("skip_and_continue"),
            FailurePolicy::Halt => f.write_str("halt"),
        }
    }
}

/// A named set of handlers sharing one sequence, optionally trailing upstream groups.
///
/// Groups are declared in any order and validated when the pipeline starts.
///
/// ```
/// use eventring::{ConsumerGroup, FailurePolicy};
///
/// let group: ConsumerGroup<u64> = ConsumerGroup::new("replicate")
///     .after("journal")
///     .policy(FailurePolicy::Halt)
///     .handle_with(|event, sequence, _end_of_batch| {
///         let _ = (event, sequence);
///         Ok(())
///     });
/// assert_eq!(group.name(), "replicate");
/// assert_eq!(group.upstream(), ["journal"]);
/// ```
pub struct ConsumerGroup<E> {
    name: String,
    upstream: Vec<String>,
    policy: FailurePolicy,
    handlers: Vec<Box<dyn EventHandler<E>>>,
}

impl<E> ConsumerGroup<E> {
    /// Declares a group with no handlers, no upstream groups and the default policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upstream: Vec::new(),
            policy: FailurePolicy::default(),
            handlers: Vec::new(),
        }
    }

    /// Adds an upstream group this group must trail.
    #[must_use]
    pub fn after(mut self, upstream: impl Into<String>) -> Self {
        let upstream = upstream.into();
        if !self.upstream.contains(&upstream) {
            self.upstream.push(upstream);
        }
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Appends a handler. Handlers run in the order they are added.
    #[must_use]
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: EventHandler<E> + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Appends a closure handler receiving `(event, sequence, end_of_batch)`.
    #[must_use]
    pub fn handle_with<F>(self, f: F) -> Self
    where
        F: FnMut(&E, i64, bool) -> HandlerResult + Send + 'static,
    {
        self.handler(FnHandler::new(f))
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the groups this group trails.
    #[must_use]
    pub fn upstream(&self) -> &[String] {
        &self.upstream
    }

    /// Failure policy.
    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn into_handlers(self) -> Vec<Box<dyn EventHandler<E>>> {
        self.handlers
    }
}

impl<E> fmt::Debug for ConsumerGroup<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerGroup")
            .field("name", &self.name)
            .field("upstream", &self.upstream)
            .field("policy", &self.policy)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl EventHandler<String> for Noop {
        fn on_event(&mut self, _event: &String, _sequence: i64, _end_of_batch: bool) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_group_builder() {
        let group = ConsumerGroup::<String>::new("audit")
            .after("journal")
            .after("journal")
            .after("risk")
            .handler(Noop)
            .handle_with(|_, _, _| Ok(()));

        assert_eq!(group.name(), "audit");
        assert_eq!(group.upstream(), ["journal", "risk"]);
        assert_eq!(group.failure_policy(), FailurePolicy::SkipAndContinue);
        assert_eq!(group.handler_count(), 2);
        assert_eq!(group.into_handlers().len(), 2);
    }

    #[test]
    fn test_policy_serde_and_display() {
        let policy: FailurePolicy = serde_json::from_str("\"halt\"").unwrap();
        assert_eq!(policy, FailurePolicy::Halt);
        assert_eq!(FailurePolicy::SkipAndContinue.to_string(), "skip_and_continue");
        assert_eq!(FailurePolicy::default(), FailurePolicy::SkipAndContinue);
    }

    #[test]
    fn test_debug_does_not_require_debug_handlers() {
        let group = ConsumerGroup::<String>::new("noop").handler(Noop);
        let rendered = format!("{group:?}");
        assert!(rendered.contains("noop"));
        assert!(rendered.contains("handlers: 1"));
    }
}
