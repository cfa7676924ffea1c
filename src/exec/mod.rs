// src/exec/mod.rs

//! Execution of scheduled tasks.
//!
//! [`backend`] defines the seam the runtime dispatches through (tests plug
//! in a fake); [`task_runner`] runs one action and reports its outcome;
//! [`command`] spawns the external programs behind `lint` and `exec` stages.

pub mod backend;
pub mod command;
pub mod task_runner;

pub use backend::{ActionExecutorBackend, DispatchFuture, ExecutorBackend};
