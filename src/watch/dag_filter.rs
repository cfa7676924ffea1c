// src/watch/dag_filter.rs

//! DAG-aware filtering of watch triggers.

use crate::dag::DagGraph;
use crate::engine::TaskName;

/// Drop every task that another matched task (transitively) depends on.
///
/// A run of the dependent task already re-runs its dependencies, so
/// triggering both would just run the dependency twice. Order of the
/// survivors is preserved.
pub fn keep_most_dependent(matched: &[TaskName], graph: &DagGraph) -> Vec<TaskName> {
    matched
        .iter()
        .filter(|task| {
            !matched
                .iter()
                .any(|other| other != *task && graph.depends_on(other, task))
        })
        .cloned()
        .collect()
}
