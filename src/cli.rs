// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::engine::TaskName;

/// Command-line arguments for `taskpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskpipe",
    version,
    about = "Run build tasks with dependencies, file pipelines and live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run. Defaults to `default`.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML). Its directory is the project root.
    #[arg(long, value_name = "PATH", default_value = "Taskpipe.toml")]
    pub config: String,

    /// Run once and exit instead of watching afterwards.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKPIPE_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print the execution plan without running
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Requested tasks, or `default`.
    pub fn targets(&self) -> Vec<TaskName> {
        if self.tasks.is_empty() {
            vec!["default".to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
