//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall status of a top-level run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run completed successfully
    Completed,
    /// Run failed
    Failed,
    /// Run was stopped from outside (Ctrl+C)
    Cancelled,
}

/// Latest known state of a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Task has not run yet
    Pending,
    /// Task is currently running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Last run completed successfully
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Last run failed
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
}

impl TaskState {
    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed { .. } | TaskState::Failed { .. })
    }
}

/// Per-binding watcher state
///
/// `Idle` -> `Triggered` on a matching change, `Triggered` -> `Running` once the
/// change settles, `Running` -> `Idle` when the run finishes. Changes seen while
/// running move to `RunningDirty`, which finishes into `Triggered` so exactly one
/// more run follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchState {
    Idle,
    Triggered,
    Running,
    RunningDirty,
}

impl WatchState {
    /// A matching change was observed
    pub fn observe_change(self) -> Self {
        match self {
            WatchState::Idle | WatchState::Triggered => WatchState::Triggered,
            WatchState::Running | WatchState::RunningDirty => WatchState::RunningDirty,
        }
    }

    /// The bound task is started
    pub fn start_run(self) -> Self {
        match self {
            WatchState::Triggered => WatchState::Running,
            other => other,
        }
    }

    /// The bound task finished (successfully or not)
    pub fn finish_run(self) -> Self {
        match self {
            WatchState::Running => WatchState::Idle,
            WatchState::RunningDirty => WatchState::Triggered,
            other => other,
        }
    }
}
