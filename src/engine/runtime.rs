// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{RunReport, ScheduledTask};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::notifier::Notifier;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the DAG scheduler in response to `RuntimeEvent`s and delegates
/// task execution to an `ExecutorBackend`.
///
/// All runtime semantics live in [`CoreRuntime`]; this shell reads events
/// from the channel, dispatches tasks, collects run reports and sends a
/// notification when a run fails.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    notifier: Option<Arc<dyn Notifier>>,
    reports: Vec<RunReport>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("reports", &self.reports.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            notifier: None,
            reports: Vec::new(),
        }
    }

    /// Send a notification whenever a run finishes with failures.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Main event loop. Returns the report of every run that finished, in
    /// order.
    pub async fn run(mut self) -> Result<Vec<RunReport>> {
        info!("taskpipe runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime event");

            let CoreStep {
                commands,
                keep_running,
            } = self.core.step(event);
            for command in commands {
                self.apply(command).await?;
            }
            if !keep_running {
                break;
            }
        }

        if !self.core.is_idle() {
            warn!("runtime stopped with a run still active; running actions are not cancelled");
        }

        info!(runs = self.reports.len(), "runtime exiting");
        Ok(self.reports)
    }

    async fn apply(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.dispatch(tasks).await?,
            CoreCommand::RunFinished(report) => {
                self.on_run_finished(&report).await;
                self.reports.push(report);
            }
            CoreCommand::RequestExit => debug!("all runs done; exiting"),
        }
        Ok(())
    }

    async fn on_run_finished(&self, report: &RunReport) {
        if report.is_success() {
            info!(run_id = report.run_id, targets = ?report.targets, "run succeeded");
            return;
        }

        for (task, err) in &report.failed {
            warn!(run_id = report.run_id, task = %task, error = %err, "run failed");
        }
        if !report.blocked.is_empty() {
            warn!(run_id = report.run_id, blocked = ?report.blocked, "tasks skipped after failure");
        }

        if let Some(notifier) = &self.notifier {
            let message = match report.failed.first() {
                Some((task, err)) => format!("{task}: {}", err.stage()),
                None => "run failed".to_string(),
            };
            notifier.notify("taskpipe: build failed", &message).await;
        }
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        debug!(
            tasks = ?tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            run_id = tasks[0].run_id,
            "dispatching ready tasks"
        );
        self.executor.dispatch(tasks).await
    }
}
