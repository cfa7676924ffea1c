use std::collections::HashMap;

use crate::engine::TaskName;
use crate::registry::TaskRegistry;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one runs.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that list this one as a dependency.
    dependents: Vec<TaskName>,
}

/// In-memory dependency graph keyed by task name.
///
/// Unlike a validated config, a hand-built registry may reference unknown
/// tasks or contain cycles; the graph just records adjacency and leaves
/// those checks to [`ExecutionPlan::resolve`](crate::dag::ExecutionPlan::resolve).
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
    /// Task names in registration order.
    order: Vec<TaskName>,
}

impl DagGraph {
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();
        let mut order = Vec::with_capacity(registry.len());

        for task in registry.iter() {
            order.push(task.name.clone());
            nodes.insert(
                task.name.clone(),
                DagNode {
                    deps: task.deps.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        for task in registry.iter() {
            for dep in task.deps.iter() {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(task.name.clone());
                }
            }
        }

        Self { nodes, order }
    }

    /// All task names, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `task` transitively depends on `other`.
    pub fn depends_on(&self, task: &str, other: &str) -> bool {
        let mut stack: Vec<&str> = self.dependencies_of(task).iter().map(|s| s.as_str()).collect();
        let mut visited: Vec<&str> = Vec::new();

        while let Some(current) = stack.pop() {
            if current == other {
                return true;
            }
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            stack.extend(self.dependencies_of(current).iter().map(|s| s.as_str()));
        }

        false
    }
}
