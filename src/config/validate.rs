// src/config/validate.rs

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{Result, TaskpipeError};
use crate::registry::validate_task_name;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every check against an unvalidated config.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task_name(name)?;
        validate_task_references(cfg, name, task)?;
        validate_task_action(name, task)?;
    }
    validate_watch_bindings(cfg)?;
    validate_dag(cfg)?;
    validate_follow_ups(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskpipeError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(TaskpipeError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    for pattern in cfg.defaults.exclude.iter().chain(cfg.livereload.watch.iter()) {
        check_glob(pattern)?;
    }

    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile, name: &str, task: &TaskConfig) -> Result<()> {
    for dep in task.after.iter() {
        if !cfg.task.contains_key(dep) {
            return Err(TaskpipeError::ConfigError(format!(
                "task '{name}' has unknown dependency '{dep}' in `after`"
            )));
        }
        if dep == name {
            return Err(TaskpipeError::ConfigError(format!(
                "task '{name}' cannot depend on itself in `after`"
            )));
        }
    }

    for next in task.then.iter() {
        if !cfg.task.contains_key(next) {
            return Err(TaskpipeError::ConfigError(format!(
                "task '{name}' has unknown follow-up '{next}' in `then`"
            )));
        }
    }

    Ok(())
}

fn validate_task_action(name: &str, task: &TaskConfig) -> Result<()> {
    if !task.clean.is_empty() && !task.src.is_empty() {
        return Err(TaskpipeError::ConfigError(format!(
            "task '{name}' declares both `clean` and `src`; split it into two tasks"
        )));
    }

    if task.src.is_empty() && (!task.stages.is_empty() || !task.exclude.is_empty()) {
        return Err(TaskpipeError::ConfigError(format!(
            "task '{name}' declares `stages`/`exclude` without any `src` pattern"
        )));
    }

    for pattern in task.src.iter().chain(task.exclude.iter()) {
        check_glob(pattern)?;
    }

    for path in task.clean.iter() {
        if path.trim().is_empty() || path.contains("..") {
            return Err(TaskpipeError::ConfigError(format!(
                "task '{name}' has an invalid `clean` path: {path:?}"
            )));
        }
    }

    Ok(())
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for binding in cfg.watch.iter() {
        if !cfg.task.contains_key(&binding.task) {
            return Err(TaskpipeError::ConfigError(format!(
                "[[watch]] binding refers to unknown task '{}'",
                binding.task
            )));
        }
        if binding.paths.is_empty() {
            return Err(TaskpipeError::ConfigError(format!(
                "[[watch]] binding for task '{}' has no `paths`",
                binding.task
            )));
        }
        for pattern in binding.paths.iter().chain(binding.exclude.iter()) {
            check_glob(pattern)?;
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task, so for `[task.B] after = ["A"]` we add A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskpipeError::DependencyCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// `then` chains must terminate, otherwise watch mode would never go idle.
fn validate_follow_ups(cfg: &RawConfigFile) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (name, task) in cfg.task.iter() {
        graph.add_node(name.as_str());
        for next in task.then.iter() {
            graph.add_edge(name.as_str(), next.as_str(), ());
        }
    }

    toposort(&graph, None).map(|_| ()).map_err(|cycle| {
        TaskpipeError::ConfigError(format!(
            "`then` follow-ups loop back to task '{}'",
            cycle.node_id()
        ))
    })
}

fn check_glob(pattern: &str) -> Result<()> {
    Glob::new(pattern)
        .map(|_| ())
        .map_err(|e| TaskpipeError::ConfigError(format!("invalid glob pattern {pattern:?}: {e}")))
}
