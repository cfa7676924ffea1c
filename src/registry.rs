// src/registry.rs

//! Task registry.
//!
//! A [`TaskRegistry`] is built once at startup (from a config file or by
//! hand) and then handed to the orchestrator, which only reads it. There is
//! no process-wide registry.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::engine::TaskName;
use crate::errors::{Result, StageError, TaskpipeError};

/// What a task's action reports on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionReport {
    /// Number of records that reached the end of the pipeline.
    pub records: usize,
    /// Paths removed by a `clean` action.
    pub removed: usize,
}

/// Per-invocation context handed to an action.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub task: TaskName,
    pub run_id: u64,
}

pub type ActionFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<ActionReport, StageError>> + Send + 'a>>;

/// The work a task performs once its dependencies are done.
///
/// Implementations: file pipelines, `clean`, group tasks, and whatever tests
/// or embedding code register by hand.
pub trait TaskAction: Send + Sync + fmt::Debug {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a>;
}

/// Action of a task that only aggregates its dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupAction;

impl TaskAction for GroupAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            debug!(task = %ctx.task, run_id = ctx.run_id, "group task: dependencies done");
            Ok::<_, StageError>(ActionReport::default())
        })
    }
}

/// A registered task.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    /// Ordered set of dependencies (first occurrence wins).
    pub deps: Vec<TaskName>,
    pub action: Arc<dyn TaskAction>,
    /// Tasks started as a new run after a run in which this one succeeded.
    pub follow_ups: Vec<TaskName>,
}

/// Registry of named tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
    /// Registration order, used wherever a deterministic "declaration order"
    /// is needed.
    order: Vec<TaskName>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task.
    ///
    /// Fails with [`TaskpipeError::ConfigError`] if the name is already
    /// taken or is not a valid task name. Dependencies are not checked here:
    /// unknown dependencies and cycles surface when a run is planned.
    pub fn register<N, D, S>(&mut self, name: N, deps: D, action: Arc<dyn TaskAction>) -> Result<()>
    where
        N: Into<TaskName>,
        D: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let name = name.into();
        validate_task_name(&name)?;

        if self.tasks.contains_key(&name) {
            return Err(TaskpipeError::duplicate_task(&name));
        }

        let mut unique: Vec<TaskName> = Vec::new();
        for dep in deps {
            let dep = dep.into();
            if !unique.contains(&dep) {
                unique.push(dep);
            }
        }

        debug!(task = %name, deps = ?unique, "registered task");

        self.order.push(name.clone());
        self.tasks.insert(
            name.clone(),
            Task {
                name,
                deps: unique,
                action,
                follow_ups: Vec::new(),
            },
        );
        Ok(())
    }

    /// Attach follow-up tasks (`then = [...]`) to an already registered task.
    pub fn set_follow_ups<S: Into<TaskName>>(
        &mut self,
        name: &str,
        follow_ups: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        let task = self
            .tasks
            .get_mut(name)
            .ok_or_else(|| TaskpipeError::UnknownTask(name.to_string()))?;
        task.follow_ups = follow_ups.into_iter().map(Into::into).collect();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }
}

/// Task names must be non-empty and free of whitespace so they survive the
/// CLI and log output unambiguously.
pub fn validate_task_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TaskpipeError::ConfigError(
            "task name must not be empty".to_string(),
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(TaskpipeError::ConfigError(format!(
            "task name {name:?} must not contain whitespace"
        )));
    }
    Ok(())
}
