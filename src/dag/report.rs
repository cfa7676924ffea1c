// src/dag/report.rs

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;
use crate::errors::{StageError, TaskpipeError};

/// What one scheduler transition changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Ready tasks to hand to the executor.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The failed task, then every dependent it blocked.
    pub newly_failed: Vec<TaskName>,
    /// The report, when this transition ended the run.
    pub finished: Option<RunReport>,
}

/// Terminal state of one DAG run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: u64,
    /// Tasks the run was started for.
    pub targets: Vec<TaskName>,
    /// Tasks whose action succeeded, in completion order.
    pub succeeded: Vec<TaskName>,
    /// Tasks whose action failed, in completion order.
    pub failed: Vec<(TaskName, StageError)>,
    /// Tasks never started because a dependency failed.
    pub blocked: Vec<TaskName>,
}

impl RunReport {
    pub fn new(run_id: u64, targets: Vec<TaskName>) -> Self {
        Self {
            run_id,
            targets,
            succeeded: Vec::new(),
            failed: Vec::new(),
            blocked: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }

    /// The first failure as a crate error, if any.
    pub fn first_failure(&self) -> Option<TaskpipeError> {
        self.failed
            .first()
            .map(|(task, err)| TaskpipeError::Stage {
                task: task.clone(),
                source: err.clone(),
            })
    }
}
