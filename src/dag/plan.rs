// src/dag/plan.rs

//! Execution plans.
//!
//! A plan is computed before any action runs: the dependency closure of the
//! requested tasks, checked for cycles up front and ordered so every task
//! comes after all of its dependencies.

use std::collections::HashSet;

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::errors::{Result, TaskpipeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    targets: Vec<TaskName>,
    order: Vec<TaskName>,
}

impl ExecutionPlan {
    /// Resolve the plan for `targets`.
    ///
    /// - [`TaskpipeError::UnknownTask`] if a target or any dependency
    ///   reachable from it is not registered.
    /// - [`TaskpipeError::DependencyCycle`] if the reachable graph has a cycle.
    ///
    /// Otherwise every task in the closure appears exactly once,
    /// dependencies first, in declaration order.
    pub fn resolve<S: AsRef<str>>(graph: &DagGraph, targets: &[S]) -> Result<Self> {
        let mut target_names: Vec<TaskName> = Vec::new();
        for target in targets {
            let target = target.as_ref();
            if !graph.contains(target) {
                return Err(TaskpipeError::UnknownTask(target.to_string()));
            }
            if !target_names.iter().any(|t| t == target) {
                target_names.push(target.to_string());
            }
        }

        let closure = collect_closure(graph, &target_names)?;
        check_acyclic(graph, &closure)?;
        let order = post_order(graph, &target_names);

        debug!(targets = ?target_names, ?order, "resolved execution plan");

        Ok(Self {
            targets: target_names,
            order,
        })
    }

    /// The tasks that were asked for.
    pub fn targets(&self) -> &[TaskName] {
        &self.targets
    }

    /// Every task to run, dependencies before dependents.
    pub fn order(&self) -> &[TaskName] {
        &self.order
    }

    pub fn contains(&self, task: &str) -> bool {
        self.order.iter().any(|t| t == task)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// All tasks reachable from `targets` through dependency edges.
fn collect_closure(graph: &DagGraph, targets: &[TaskName]) -> Result<Vec<TaskName>> {
    let mut seen: HashSet<TaskName> = HashSet::new();
    let mut closure = Vec::new();
    let mut stack: Vec<TaskName> = targets.to_vec();

    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        for dep in graph.dependencies_of(&name) {
            if !graph.contains(dep) {
                return Err(TaskpipeError::UnknownTask(format!(
                    "{dep} (dependency of '{name}')"
                )));
            }
            stack.push(dep.clone());
        }
        closure.push(name);
    }

    Ok(closure)
}

/// Pure cycle pre-check over the closure.
fn check_acyclic(graph: &DagGraph, closure: &[TaskName]) -> Result<()> {
    // Edge direction: dep -> task.
    let mut g: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in closure {
        g.add_node(name.as_str());
    }
    for name in closure {
        for dep in graph.dependencies_of(name) {
            g.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    let Err(cycle) = toposort(&g, None) else {
        return Ok(());
    };

    let offender = cycle.node_id();
    let mut members: Vec<&str> = kosaraju_scc(&g)
        .into_iter()
        .find(|scc| scc.contains(&offender))
        .unwrap_or_else(|| vec![offender]);
    members.sort_unstable();

    Err(TaskpipeError::DependencyCycle(format!(
        "tasks {} depend on each other",
        members
            .iter()
            .map(|m| format!("'{m}'"))
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

/// Depth-first post-order over dependency lists. Assumes the graph reachable
/// from `targets` is acyclic and fully known.
fn post_order(graph: &DagGraph, targets: &[TaskName]) -> Vec<TaskName> {
    let mut done: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();

    for target in targets {
        let mut stack: Vec<(&str, usize)> = vec![(target.as_str(), 0)];

        while let Some((name, next_dep)) = stack.pop() {
            if done.contains(name) {
                continue;
            }

            let deps = graph.dependencies_of(name);
            if let Some(dep) = deps.get(next_dep) {
                stack.push((name, next_dep + 1));
                if !done.contains(dep.as_str()) {
                    stack.push((dep.as_str(), 0));
                }
            } else {
                done.insert(name);
                order.push(name.to_string());
            }
        }
    }

    order
}
