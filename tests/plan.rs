// tests/plan.rs

use std::sync::Arc;

use taskpipe::dag::{DagGraph, ExecutionPlan};
use taskpipe::errors::TaskpipeError;
use taskpipe::registry::{GroupAction, TaskRegistry};

fn registry(tasks: &[(&str, &[&str])]) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for (name, deps) in tasks {
        registry
            .register(*name, deps.iter().copied(), Arc::new(GroupAction))
            .unwrap();
    }
    registry
}

fn position(plan: &ExecutionPlan, task: &str) -> usize {
    plan.order()
        .iter()
        .position(|t| t == task)
        .unwrap_or_else(|| panic!("{task} not in plan {:?}", plan.order()))
}

#[test]
fn styles_plan_runs_both_dependencies_first() {
    let reg = registry(&[
        ("clean", &[]),
        ("sass", &[]),
        ("old-ie", &[]),
        ("styles", &["sass", "old-ie"]),
    ]);
    let graph = DagGraph::from_registry(&reg);

    let plan = ExecutionPlan::resolve(&graph, &["styles"]).unwrap();

    assert_eq!(plan.targets(), &["styles".to_string()]);
    assert_eq!(plan.order(), &["sass", "old-ie", "styles"]);
    assert!(!plan.contains("clean"));
}

#[test]
fn diamond_closure_contains_each_task_once() {
    let reg = registry(&[
        ("base", &[]),
        ("left", &["base"]),
        ("right", &["base"]),
        ("top", &["left", "right"]),
    ]);
    let graph = DagGraph::from_registry(&reg);

    let plan = ExecutionPlan::resolve(&graph, &["top", "left"]).unwrap();

    assert_eq!(plan.len(), 4);
    assert!(position(&plan, "base") < position(&plan, "left"));
    assert!(position(&plan, "base") < position(&plan, "right"));
    assert!(position(&plan, "left") < position(&plan, "top"));
    assert!(position(&plan, "right") < position(&plan, "top"));
}

#[test]
fn duplicate_targets_collapse() {
    let reg = registry(&[("sass", &[])]);
    let graph = DagGraph::from_registry(&reg);

    let plan = ExecutionPlan::resolve(&graph, &["sass", "sass"]).unwrap();
    assert_eq!(plan.targets(), &["sass".to_string()]);
    assert_eq!(plan.order(), &["sass"]);
}

#[test]
fn two_task_cycle_is_detected_before_running() {
    let reg = registry(&[("a", &["b"]), ("b", &["a"])]);
    let graph = DagGraph::from_registry(&reg);

    let err = ExecutionPlan::resolve(&graph, &["a"]).unwrap_err();
    match err {
        TaskpipeError::DependencyCycle(msg) => {
            assert!(msg.contains("'a'"), "{msg}");
            assert!(msg.contains("'b'"), "{msg}");
        }
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn cycle_outside_the_closure_does_not_matter() {
    let reg = registry(&[("a", &["b"]), ("b", &["a"]), ("lonely", &[])]);
    let graph = DagGraph::from_registry(&reg);

    let plan = ExecutionPlan::resolve(&graph, &["lonely"]).unwrap();
    assert_eq!(plan.order(), &["lonely"]);
}

#[test]
fn self_dependency_is_a_cycle() {
    let reg = registry(&[("loop", &["loop"])]);
    let graph = DagGraph::from_registry(&reg);

    let err = ExecutionPlan::resolve(&graph, &["loop"]).unwrap_err();
    assert!(matches!(err, TaskpipeError::DependencyCycle(_)), "got {err:?}");
}

#[test]
fn unknown_target_and_unknown_dependency() {
    let reg = registry(&[("styles", &["sass"])]);
    let graph = DagGraph::from_registry(&reg);

    let err = ExecutionPlan::resolve(&graph, &["scripts"]).unwrap_err();
    assert!(matches!(err, TaskpipeError::UnknownTask(ref n) if n == "scripts"), "got {err:?}");

    let err = ExecutionPlan::resolve(&graph, &["styles"]).unwrap_err();
    match err {
        TaskpipeError::UnknownTask(msg) => assert!(msg.starts_with("sass"), "{msg}"),
        other => panic!("expected UnknownTask, got {other:?}"),
    }
}

#[test]
fn graph_reports_transitive_dependencies() {
    let reg = registry(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
    let graph = DagGraph::from_registry(&reg);

    assert!(graph.depends_on("c", "a"));
    assert!(graph.depends_on("b", "a"));
    assert!(!graph.depends_on("a", "c"));
    assert_eq!(graph.dependents_of("a"), &["b".to_string()]);
}
