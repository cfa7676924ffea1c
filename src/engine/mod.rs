// src/engine/mod.rs

//! Run loop.
//!
//! [`CoreRuntime`] is a synchronous state machine: it takes one
//! [`RuntimeEvent`] at a time (a trigger batch, a task completion, a
//! shutdown) and answers with [`CoreCommand`]s. Triggers that arrive while a
//! run is active wait in the [`TriggerQueue`]. [`Runtime`] is the async
//! shell that reads events off a channel and carries the commands out.

use crate::errors::StageError;

pub type TaskName = String;

/// Outcome of a task action for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(StageError),
}

/// Why a batch of tasks was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested on the command line or through the orchestrator API.
    Manual,
    /// A watched file changed.
    FileWatch,
    /// `then` list of a task that succeeded in the previous run.
    FollowUp,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Stop once nothing is running, queued or waiting as a follow-up.
    pub exit_when_idle: bool,
}

/// Input of the run loop.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run these tasks (and their dependencies) as one batch.
    TaskTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    /// A task action finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Ctrl-C, SIGTERM or the end of a test.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use crate::types::OverlapPolicy;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
