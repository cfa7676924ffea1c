use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::plan::ExecutionPlan;
use crate::dag::report::{RunReport, SchedulerStep};
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{Result, TaskpipeError};
use crate::registry::TaskRegistry;

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - turning requested targets into an [`ExecutionPlan`]
/// - deciding when a planned task is ready (all deps succeeded this run)
/// - blocking dependents when a task fails
/// - producing a [`RunReport`] once every planned task is terminal
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    run_counter: u64,
    /// Report being built for the active run, `None` when idle.
    current: Option<RunReport>,
}

impl Scheduler {
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let graph = DagGraph::from_registry(registry);
        let tasks = registry
            .iter()
            .map(|task| (task.name.clone(), TaskInfo::from_task(task)))
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current: None,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Resolve the plan for `targets` without touching run state.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<ExecutionPlan> {
        ExecutionPlan::resolve(&self.graph, targets)
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current.as_ref().map(|r| r.run_id)
    }

    /// Run state of `task`, or `None` if the task is unknown.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        if self.current.is_none() {
            return Some(TaskRunState::NotInRun);
        }
        Some(info.run_state.into())
    }

    /// Whether every dependency of `task` has succeeded in the active run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// How many times `task` has been dispatched since the scheduler was built.
    pub fn invocations_of(&self, task: &str) -> u64 {
        self.tasks.get(task).map(|i| i.invocations).unwrap_or(0)
    }

    /// Tasks to start after a run in which `task` succeeded.
    pub fn follow_ups_of(&self, task: &str) -> &[TaskName] {
        self.tasks
            .get(task)
            .map(|i| i.follow_ups.as_slice())
            .unwrap_or(&[])
    }

    /// Start a run for a resolved plan.
    ///
    /// Every planned task starts `Pending`; tasks with no dependencies are
    /// returned in `newly_scheduled`.
    pub fn start_run(&mut self, plan: &ExecutionPlan) -> Result<SchedulerStep> {
        if let Some(active) = &self.current {
            return Err(TaskpipeError::ConfigError(format!(
                "cannot start a run while run {} is still active",
                active.run_id
            )));
        }

        self.run_counter += 1;
        let run_id = self.run_counter;
        self.current = Some(RunReport::new(run_id, plan.targets().to_vec()));
        info!(run_id, targets = ?plan.targets(), tasks = plan.len(), "starting run");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
        manager.mark_planned_pending(plan.order());
        let newly_scheduled = manager.collect_new_ready_tasks();

        Ok(SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            finished: self.maybe_finish_run(),
        })
    }

    /// Record the outcome of a dispatched task.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id() else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return SchedulerStep::default();
        };

        if info.run_state != Some(RunState::Running) {
            warn!(task = %task, state = ?info.run_state, "completion for task that is not running; ignoring");
            return SchedulerStep::default();
        }

        let mut step = SchedulerStep::default();
        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                debug!(task = %task, run_id, "task succeeded");
                if let Some(report) = self.current.as_mut() {
                    report.succeeded.push(task.to_string());
                }
                let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
                step.newly_scheduled = manager.collect_new_ready_tasks();
            }
            TaskOutcome::Failed(err) => {
                info.run_state = Some(RunState::DoneFailed);
                warn!(task = %task, run_id, error = %err, "task failed; blocking dependents in this run");

                let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
                let blocked = manager.mark_dependents_blocked(task);

                step.newly_failed.push(task.to_string());
                step.newly_failed.extend(blocked.iter().cloned());
                if let Some(report) = self.current.as_mut() {
                    report.failed.push((task.to_string(), err));
                    report.blocked.extend(blocked);
                }
            }
        }

        step.finished = self.maybe_finish_run();
        step
    }

    /// Close the active run if every task reached a terminal state.
    fn maybe_finish_run(&mut self) -> Option<RunReport> {
        let run_id = self.current_run_id()?;
        let manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
        if !manager.all_tasks_terminal() {
            return None;
        }

        let report = self.current.take()?;
        info!(
            run_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            blocked = report.blocked.len(),
            "run finished"
        );
        Some(report)
    }
}
