use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use taskpipe::dag::ScheduledTask;
use taskpipe::engine::{RuntimeEvent, TaskOutcome};
use taskpipe::errors::StageError;
use taskpipe::exec::{DispatchFuture, ExecutorBackend};
use tokio::sync::mpsc;

/// Executor that never runs an action. Every dispatched task is logged to
/// `executed` and completes right away, successfully unless it was marked
/// with [`failing`](Self::failing).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    fn outcome_for(&self, task: &str) -> TaskOutcome {
        if self.failing.contains(task) {
            TaskOutcome::Failed(StageError::failed("fake", "configured to fail"))
        } else {
            TaskOutcome::Success
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> DispatchFuture<'_> {
        let completions: Vec<RuntimeEvent> = tasks
            .into_iter()
            .map(|t| {
                self.executed.lock().unwrap().push(t.name.clone());
                RuntimeEvent::TaskCompleted {
                    outcome: self.outcome_for(&t.name),
                    task: t.name,
                }
            })
            .collect();
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for event in completions {
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
