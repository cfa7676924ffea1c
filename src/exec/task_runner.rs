// src/exec/task_runner.rs

//! Runs a single task action and reports its outcome.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::StageError;
use crate::registry::ActionContext;

/// Run `task`'s action to completion and send `TaskCompleted`.
///
/// The action runs in its own tokio task so that a panic inside a stage is
/// reported as a failure instead of leaving the run waiting forever.
pub async fn run_task(task: ScheduledTask, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let ctx = ActionContext {
        task: task.name.clone(),
        run_id: task.run_id,
    };
    let action = task.action.clone();
    let started = Instant::now();

    info!(task = %task.name, run_id = task.run_id, "running task action");

    let joined = tokio::spawn(async move { action.run(&ctx).await }).await;

    let outcome = match joined {
        Ok(Ok(report)) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                records = report.records,
                removed = report.removed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            TaskOutcome::Success
        }
        Ok(Err(err)) => {
            warn!(
                task = %task.name,
                run_id = task.run_id,
                stage = err.stage(),
                error = %err,
                "task failed"
            );
            TaskOutcome::Failed(err)
        }
        Err(join_err) => {
            error!(task = %task.name, run_id = task.run_id, error = %join_err, "task action panicked");
            TaskOutcome::Failed(StageError::failed("action", join_err))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %task.name, "runtime gone; dropping task completion");
    }
}
