// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Mutable view over the scheduler's task table for the active run.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        run_id: u64,
    ) -> Self {
        Self {
            graph,
            tasks,
            run_id,
        }
    }

    /// Put every planned task into `Pending`; everything else leaves the run.
    pub fn mark_planned_pending(&mut self, order: &[TaskName]) {
        for info in self.tasks.values_mut() {
            info.run_state = None;
        }
        for name in order {
            match self.tasks.get_mut(name) {
                Some(info) => info.run_state = Some(RunState::Pending),
                None => warn!(task = %name, "planned task missing from tasks map"),
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every pending dependent of `failed_task` (transitively) as
    /// `DoneFailed`. Returns the newly blocked tasks, excluding the root.
    pub fn mark_dependents_blocked(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut blocked = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if info.run_state == Some(RunState::Pending) {
                info.run_state = Some(RunState::DoneFailed);
                debug!(task = %info.name, blocked_by = %failed_task, "dependency failed; task blocked");
                blocked.push(info.name.clone());
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }

        blocked
    }

    /// Collect `Pending` tasks whose dependencies all succeeded in this run,
    /// mark them `Running` and return them in registration order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = self
            .graph
            .tasks()
            .filter(|name| {
                self.tasks.get(*name).is_some_and(|info| {
                    info.run_state == Some(RunState::Pending)
                        && self.deps_satisfied_for_info(info)
                })
            })
            .map(str::to_string)
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.invocations > 0 {
                    info!(task = %info.name, run_id = self.run_id, "starting task again");
                } else {
                    info!(task = %info.name, run_id = self.run_id, "starting task");
                }

                info.run_state = Some(RunState::Running);
                info.invocations += 1;
                info.last_run = Some(self.run_id);
                ready.push(ScheduledTask::from_task_info(info, self.run_id));
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// Shared-borrow counterpart of [`StateManager`] for dependency checks.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// A dependency is satisfied only once it has succeeded in the current
    /// run. Earlier runs do not count.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state == Some(RunState::DoneSuccess),
            None => {
                warn!(task = %info.name, dep = %dep_name, "dependency missing from tasks map");
                false
            }
        })
    }
}
