// src/exec/backend.rs

//! Where dispatched tasks go.
//!
//! [`Runtime`](crate::engine::Runtime) hands every batch of ready tasks to
//! an [`ExecutorBackend`]. Completion always comes back asynchronously as
//! `RuntimeEvent::TaskCompleted`, never as the return value of `dispatch`.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::task_runner::run_task;

pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait ExecutorBackend: Send {
    /// Start `tasks`. Errors only for dispatch problems; task failures are
    /// reported through `TaskCompleted`.
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> DispatchFuture<'_>;
}

/// Runs each task's registered action as its own tokio task, so tasks that
/// become ready together make progress concurrently.
#[derive(Debug, Clone)]
pub struct ActionExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl ActionExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runtime_tx }
    }
}

impl ExecutorBackend for ActionExecutorBackend {
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> DispatchFuture<'_> {
        for task in tasks {
            debug!(task = %task.name, run_id = task.run_id, "dispatching task");
            tokio::spawn(run_task(task, self.runtime_tx.clone()));
        }
        Box::pin(async { Ok(()) })
    }
}
