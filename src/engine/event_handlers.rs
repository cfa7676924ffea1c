// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, error, info};

use crate::dag::{RunReport, ScheduledTask, Scheduler};
use crate::engine::queue::{TriggerQueue, merge_unique};
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// A run reached a terminal state.
    RunFinished(RunReport),
    /// Nothing left to do (one-shot mode).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Work waiting for the scheduler to go idle.
#[derive(Debug, Default)]
pub struct PendingRuns {
    /// `then` targets of tasks that succeeded in the last run. Started
    /// before anything in the trigger queue.
    pub follow_ups: Vec<TaskName>,
}

/// Handle a trigger event.
///
/// Runs never overlap: while idle the batch starts a run right away, while a
/// run is active it goes to the trigger queue.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    pending: &mut PendingRuns,
    options: &RuntimeOptions,
    tasks: Vec<TaskName>,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    if scheduler.is_idle() && pending.follow_ups.is_empty() && queue.is_empty() {
        commands.extend(start_run(scheduler, &tasks, reason));
    } else {
        debug!(?tasks, ?reason, "run active; recording trigger in queue");
        queue.record_trigger(&tasks);
    }

    commands.extend(start_next_if_idle(scheduler, queue, pending));
    finish_step(scheduler, queue, pending, options, commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    pending: &mut PendingRuns,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.handle_completion(&task, outcome);
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    if let Some(report) = step.finished {
        for succeeded in &report.succeeded {
            merge_unique(&mut pending.follow_ups, scheduler.follow_ups_of(succeeded));
        }
        if !pending.follow_ups.is_empty() {
            debug!(follow_ups = ?pending.follow_ups, "run finished; follow-ups pending");
        }
        commands.push(CoreCommand::RunFinished(report));
    }

    commands.extend(start_next_if_idle(scheduler, queue, pending));
    finish_step(scheduler, queue, pending, options, commands)
}

/// Plan and start a run for `targets`.
///
/// Planning errors are logged and the batch is dropped; callers that need
/// the error resolve the plan themselves before triggering.
pub fn start_run(
    scheduler: &mut Scheduler,
    targets: &[TaskName],
    reason: TriggerReason,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();
    if targets.is_empty() {
        return commands;
    }

    let plan = match scheduler.plan(targets) {
        Ok(plan) => plan,
        Err(err) => {
            error!(?targets, error = %err, "cannot plan run; dropping trigger");
            return commands;
        }
    };

    match scheduler.start_run(&plan) {
        Ok(step) => {
            info!(?targets, ?reason, order = ?plan.order(), "run started");
            if !step.newly_scheduled.is_empty() {
                commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
            }
            if let Some(report) = step.finished {
                commands.push(CoreCommand::RunFinished(report));
            }
        }
        Err(err) => error!(?targets, error = %err, "cannot start run"),
    }

    commands
}

/// While idle, start follow-ups first, then the oldest queued batch.
fn start_next_if_idle(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    pending: &mut PendingRuns,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    while scheduler.is_idle() {
        let (targets, reason) = if !pending.follow_ups.is_empty() {
            (std::mem::take(&mut pending.follow_ups), TriggerReason::FollowUp)
        } else if let Some(batch) = queue.next_batch() {
            (batch, TriggerReason::FileWatch)
        } else {
            break;
        };

        commands.extend(start_run(scheduler, &targets, reason));
    }

    commands
}

fn finish_step(
    scheduler: &Scheduler,
    queue: &TriggerQueue,
    pending: &PendingRuns,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let mut keep_running = true;
    if options.exit_when_idle
        && scheduler.is_idle()
        && queue.is_empty()
        && pending.follow_ups.is_empty()
    {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
