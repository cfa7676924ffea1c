// src/dag/mod.rs

//! Task graph, planning and per-run scheduling.
//!
//! A request for some targets goes through three stages here: the
//! [`DagGraph`] built from the registry, an [`ExecutionPlan`] (closure of the
//! targets, cycle-checked, dependencies first) and the [`Scheduler`], which
//! walks one plan at a time, releasing tasks as their dependencies succeed
//! and blocking dependents of failures. [`state_manager`] holds the per-task
//! run state the scheduler mutates.

pub mod graph;
pub mod plan;
pub mod report;
pub mod scheduler;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use plan::ExecutionPlan;
pub use report::{RunReport, SchedulerStep};
pub use scheduler::Scheduler;
pub use task_info::{ScheduledTask, TaskRunState};
