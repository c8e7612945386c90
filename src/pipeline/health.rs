//! Lifecycle state and observability snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a [`Pipeline`](crate::Pipeline).
///
/// Transitions only move forward: `Created -> Started -> Draining -> Stopped`,
/// with `Created -> Stopped` allowed when a never-started pipeline is drained or
/// shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PipelineState {
    /// Groups may be registered; nothing is running.
    Created = 0,
    /// Consumer groups are running and publishing is accepted.
    Started = 1,
    /// Publishing is rejected; groups finish what was already published.
    Draining = 2,
    /// All group threads have exited or were detached.
    Stopped = 3,
}

impl PipelineState {
    /// Raw representation stored in the pipeline's state cell.
    #[must_use]
    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a raw state value. Unknown values map to `Stopped`.
    #[must_use]
    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PipelineState::Created,
            1 => PipelineState::Started,
            2 => PipelineState::Draining,
            _ => PipelineState::Stopped,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Created => "created",
            PipelineState::Started => "started",
            PipelineState::Draining => "draining",
            PipelineState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Runtime status of one consumer group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Registered but the pipeline has not started yet.
    Pending,
    /// The group thread is processing events.
    Running,
    /// A handler failed under [`FailurePolicy::Halt`](crate::FailurePolicy::Halt).
    /// The group no longer advances and keeps gating producers.
    Faulted,
    /// The group thread exited.
    Stopped,
}

impl GroupStatus {
    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            GroupStatus::Pending => 0,
            GroupStatus::Running => 1,
            GroupStatus::Faulted => 2,
            GroupStatus::Stopped => 3,
        }
    }

    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => GroupStatus::Pending,
            1 => GroupStatus::Running,
            2 => GroupStatus::Faulted,
            _ => GroupStatus::Stopped,
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Running => "running",
            GroupStatus::Faulted => "faulted",
            GroupStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Progress of a single consumer group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHealth {
    /// Group name
    pub name: String,
    /// Highest sequence fully processed by the group
    pub sequence: i64,
    /// Published events the group has not finished yet (`cursor - sequence`)
    pub lag: i64,
    /// Current status
    pub status: GroupStatus,
}

/// Point-in-time snapshot of the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineHealth {
    /// Lifecycle state
    pub state: PipelineState,
    /// Highest published sequence
    pub cursor: i64,
    /// Per-group progress in registration order
    pub groups: Vec<GroupHealth>,
}

impl PipelineHealth {
    /// Largest lag among all groups, zero when there are none.
    #[must_use]
    pub fn max_lag(&self) -> i64 {
        self.groups.iter().map(|group| group.lag).max().unwrap_or(0)
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupHealth> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Serializes the snapshot as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; this does not happen for well-formed snapshots.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Unprocessed events left behind in one group by a forced shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBacklog {
    /// Group name
    pub name: String,
    /// Events published but never completed by this group
    pub unprocessed: u64,
}

/// Outcome of [`Pipeline::shutdown`](crate::Pipeline::shutdown).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Published events that did not reach every consumer group.
    ///
    /// This is the largest backlog across groups: each such event was skipped by
    /// at least one group.
    pub dropped_events: u64,
    /// Backlog of every group that did not finish
    pub groups: Vec<GroupBacklog>,
    /// `true` if the timeout expired before the groups went quiet
    pub timed_out: bool,
    /// Groups whose thread was still busy in a handler at the deadline and was detached
    pub detached_groups: Vec<String>,
}

impl ShutdownReport {
    /// `true` when every published event was processed and every thread joined.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_events == 0 && !self.timed_out && self.detached_groups.is_empty()
    }
}
