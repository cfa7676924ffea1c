// src/errors.rs

//! Crate-wide error types.
//!
//! [`TaskpipeError`] is what the public API returns. [`StageError`] is the
//! failure of a single pipeline stage; it is `Clone` so it can travel inside
//! a [`TaskOutcome`](crate::engine::TaskOutcome) from the executor back to
//! the scheduler and end up in a [`RunReport`](crate::dag::RunReport).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskpipeError {
    /// Duplicate or invalid task registration, or an invalid config file.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("Task '{task}' failed: {source}")]
    Stage {
        task: String,
        #[source]
        source: StageError,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskpipeError {
    pub fn duplicate_task(name: &str) -> Self {
        TaskpipeError::ConfigError(format!("task '{name}' is already registered"))
    }
}

/// Failure reported by a pipeline stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A checking stage (linter) rejected its input. Halts the pipeline
    /// before any later stage runs.
    #[error("{stage} reported {} violation(s):\n{}", .violations.len(), .violations.join("\n"))]
    Violations {
        stage: String,
        violations: Vec<String>,
    },

    /// Any other stage failure (compilation, compression, IO, ...).
    #[error("{stage} failed: {message}")]
    Failed { stage: String, message: String },
}

impl StageError {
    pub fn failed(stage: impl Into<String>, message: impl ToString) -> Self {
        StageError::Failed {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Name of the stage that produced this error.
    pub fn stage(&self) -> &str {
        match self {
            StageError::Violations { stage, .. } | StageError::Failed { stage, .. } => stage,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskpipeError>;
