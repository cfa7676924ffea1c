// tests/scheduler.rs

use std::sync::Arc;

use taskpipe::dag::{Scheduler, TaskRunState};
use taskpipe::engine::TaskOutcome;
use taskpipe::errors::{StageError, TaskpipeError};
use taskpipe::registry::{GroupAction, TaskRegistry};

fn scheduler(tasks: &[(&str, &[&str])]) -> Scheduler {
    let mut registry = TaskRegistry::new();
    for (name, deps) in tasks {
        registry
            .register(*name, deps.iter().copied(), Arc::new(GroupAction))
            .unwrap();
    }
    Scheduler::from_registry(&registry)
}

fn names(step: &taskpipe::dag::SchedulerStep) -> Vec<&str> {
    step.newly_scheduled.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn independent_dependencies_are_ready_together() {
    let mut s = scheduler(&[
        ("sass", &[]),
        ("old-ie", &[]),
        ("styles", &["sass", "old-ie"]),
    ]);
    let plan = s.plan(&["styles"]).unwrap();

    let step = s.start_run(&plan).unwrap();
    assert_eq!(names(&step), vec!["sass", "old-ie"]);
    assert_eq!(s.run_state_of("styles"), Some(TaskRunState::Pending));
    assert_eq!(s.run_state_of("sass"), Some(TaskRunState::Running));

    let step = s.handle_completion("sass", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(s.deps_satisfied("styles"), Some(false));

    let step = s.handle_completion("old-ie", TaskOutcome::Success);
    assert_eq!(names(&step), vec!["styles"]);

    let step = s.handle_completion("styles", TaskOutcome::Success);
    let report = step.finished.expect("run should be finished");
    assert!(report.is_success());
    assert_eq!(report.succeeded, vec!["sass", "old-ie", "styles"]);
    assert!(s.is_idle());
    assert_eq!(s.run_state_of("styles"), Some(TaskRunState::NotInRun));
}

#[test]
fn failure_blocks_transitive_dependents() {
    let mut s = scheduler(&[
        ("lint", &[]),
        ("bundle", &["lint"]),
        ("deploy", &["bundle"]),
        ("images", &[]),
    ]);
    let plan = s.plan(&["deploy", "images"]).unwrap();
    s.start_run(&plan).unwrap();

    let err = StageError::Violations {
        stage: "lint".into(),
        violations: vec!["app/js/main.js: missing semicolon".into()],
    };
    let step = s.handle_completion("lint", TaskOutcome::Failed(err.clone()));
    assert_eq!(step.newly_failed, vec!["lint", "bundle", "deploy"]);
    assert!(step.finished.is_none(), "images is still running");

    let step = s.handle_completion("images", TaskOutcome::Success);
    let report = step.finished.expect("run should be finished");
    assert!(!report.is_success());
    assert_eq!(report.failed, vec![("lint".to_string(), err.clone())]);
    assert_eq!(report.blocked, vec!["bundle", "deploy"]);
    assert_eq!(report.succeeded, vec!["images"]);
    assert_eq!(s.invocations_of("bundle"), 0);

    match report.first_failure() {
        Some(TaskpipeError::Stage { task, source }) => {
            assert_eq!(task, "lint");
            assert_eq!(source, err);
        }
        other => panic!("expected stage error, got {other:?}"),
    }
}

#[test]
fn only_one_run_at_a_time() {
    let mut s = scheduler(&[("a", &[])]);
    let plan = s.plan(&["a"]).unwrap();
    s.start_run(&plan).unwrap();

    let err = s.start_run(&plan).unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)));
    assert_eq!(s.current_run_id(), Some(1));
}

#[test]
fn stray_completions_are_ignored() {
    let mut s = scheduler(&[("a", &[]), ("b", &["a"])]);

    // No run yet.
    let step = s.handle_completion("a", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty() && step.finished.is_none());

    let plan = s.plan(&["b"]).unwrap();
    s.start_run(&plan).unwrap();

    // `b` is pending, not running.
    let step = s.handle_completion("b", TaskOutcome::Success);
    assert!(step.finished.is_none());
    assert_eq!(s.run_state_of("b"), Some(TaskRunState::Pending));

    let step = s.handle_completion("ghost", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
}

#[test]
fn every_run_dispatches_each_task_once() {
    let mut s = scheduler(&[("a", &[]), ("b", &["a"])]);

    for run in 1..=3u64 {
        let plan = s.plan(&["b"]).unwrap();
        s.start_run(&plan).unwrap();
        assert_eq!(s.current_run_id(), Some(run));
        s.handle_completion("a", TaskOutcome::Success);
        let step = s.handle_completion("b", TaskOutcome::Success);
        assert_eq!(step.finished.map(|r| r.run_id), Some(run));
    }

    assert_eq!(s.invocations_of("a"), 3);
    assert_eq!(s.invocations_of("b"), 3);
}
