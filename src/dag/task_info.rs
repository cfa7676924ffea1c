// src/dag/task_info.rs

//! Task metadata and per-run state.

use std::fmt;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::registry::{Task, TaskAction};

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of the current plan, waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    DoneSuccess,
    /// Failed itself, or was blocked by a failed dependency.
    DoneFailed,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not part of the current run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static task information from the registry, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
    pub follow_ups: Vec<TaskName>,
    pub action: Arc<dyn TaskAction>,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// How many times the action has been dispatched, across all runs.
    pub invocations: u64,

    /// Last run ID in which this task was dispatched.
    pub last_run: Option<u64>,
}

impl TaskInfo {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            deps: task.deps.clone(),
            follow_ups: task.follow_ups.clone(),
            action: Arc::clone(&task.action),
            run_state: None,
            invocations: 0,
            last_run: None,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub action: Arc<dyn TaskAction>,
    /// All tasks of the same run share a `run_id`.
    pub run_id: u64,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            action: Arc::clone(&info.action),
            run_id,
        }
    }
}
