// tests/orchestrator.rs

use std::error::Error;
use std::time::Duration;

use taskpipe::errors::{StageError, TaskpipeError};
use taskpipe::orchestrator::Orchestrator;
use taskpipe::registry::TaskRegistry;
use taskpipe_test_utils::recording::{
    InvocationLog, RecordingAction, RecordingNotifier, invocation_log,
};
use taskpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn count(log: &InvocationLog, task: &str) -> usize {
    log.lock().unwrap().iter().filter(|t| *t == task).count()
}

fn index(log: &InvocationLog, task: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .position(|t| t == task)
        .unwrap_or_else(|| panic!("{task} never ran"))
}

/// clean, sass, old-ie, styles -> [sass, old-ie]
fn styles_registry(log: &InvocationLog) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry
        .register("clean", Vec::<String>::new(), RecordingAction::new(log).arc())
        .unwrap();
    registry
        .register(
            "sass",
            Vec::<String>::new(),
            RecordingAction::new(log)
                .with_delay(Duration::from_millis(20))
                .arc(),
        )
        .unwrap();
    registry
        .register("old-ie", Vec::<String>::new(), RecordingAction::new(log).arc())
        .unwrap();
    registry
        .register("styles", ["sass", "old-ie"], RecordingAction::new(log).arc())
        .unwrap();
    registry
}

#[tokio::test]
async fn styles_runs_sass_and_old_ie_once_each_first() -> TestResult {
    init_tracing();
    let log = invocation_log();
    let orchestrator = Orchestrator::new(styles_registry(&log));

    let report = with_timeout(orchestrator.run("styles")).await?;

    assert_eq!(count(&log, "sass"), 1);
    assert_eq!(count(&log, "old-ie"), 1);
    assert_eq!(count(&log, "styles"), 1);
    assert_eq!(count(&log, "clean"), 0);
    assert!(index(&log, "sass") < index(&log, "styles"));
    assert!(index(&log, "old-ie") < index(&log, "styles"));

    assert!(report.is_success());
    assert_eq!(report.targets, vec!["styles"]);
    assert_eq!(report.succeeded.last().map(String::as_str), Some("styles"));
    Ok(())
}

#[tokio::test]
async fn shared_dependency_runs_once_per_run() -> TestResult {
    init_tracing();
    let log = invocation_log();
    let mut registry = TaskRegistry::new();
    registry.register("base", Vec::<String>::new(), RecordingAction::new(&log).arc())?;
    registry.register("left", ["base", "base"], RecordingAction::new(&log).arc())?;
    registry.register("right", ["base"], RecordingAction::new(&log).arc())?;
    registry.register("top", ["left", "right", "base"], RecordingAction::new(&log).arc())?;
    let orchestrator = Orchestrator::new(registry);

    with_timeout(orchestrator.run("top")).await?;
    assert_eq!(count(&log, "base"), 1);
    assert_eq!(log.lock().unwrap().len(), 4);

    // A second run invokes everything again, once.
    with_timeout(orchestrator.run("top")).await?;
    assert_eq!(count(&log, "base"), 2);
    assert_eq!(log.lock().unwrap().len(), 8);
    Ok(())
}

#[tokio::test]
async fn cycle_fails_before_any_action_runs() {
    init_tracing();
    let log = invocation_log();
    let mut registry = TaskRegistry::new();
    registry.register("a", ["b"], RecordingAction::new(&log).arc()).unwrap();
    registry.register("b", ["a"], RecordingAction::new(&log).arc()).unwrap();

    let err = with_timeout(Orchestrator::new(registry).run("a"))
        .await
        .unwrap_err();

    assert!(matches!(err, TaskpipeError::DependencyCycle(_)), "got {err:?}");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_task_is_reported() {
    let log = invocation_log();
    let orchestrator = Orchestrator::new(styles_registry(&log));

    let err = with_timeout(orchestrator.run("scripts")).await.unwrap_err();
    assert!(matches!(err, TaskpipeError::UnknownTask(ref n) if n == "scripts"), "got {err:?}");
}

#[tokio::test]
async fn failing_dependency_surfaces_its_stage_error() {
    init_tracing();
    let log = invocation_log();
    let violation = StageError::Violations {
        stage: "lint".into(),
        violations: vec!["app/js/main.js: 3: unused variable".into()],
    };

    let mut registry = TaskRegistry::new();
    registry
        .register(
            "lint",
            Vec::<String>::new(),
            RecordingAction::new(&log).failing(violation.clone()).arc(),
        )
        .unwrap();
    registry
        .register("scripts", ["lint"], RecordingAction::new(&log).arc())
        .unwrap();

    let notifier = RecordingNotifier::new();
    let orchestrator =
        Orchestrator::new(registry).with_notifier(std::sync::Arc::new(notifier.clone()));

    let err = with_timeout(orchestrator.run("scripts")).await.unwrap_err();
    match err {
        TaskpipeError::Stage { task, source } => {
            assert_eq!(task, "lint");
            assert_eq!(source, violation);
        }
        other => panic!("expected stage error, got {other:?}"),
    }
    assert_eq!(count(&log, "scripts"), 0);
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(notifier.sent()[0].1, "lint: lint");
}

#[tokio::test]
async fn follow_ups_run_as_separate_runs() -> TestResult {
    init_tracing();
    let log = invocation_log();
    let mut registry = styles_registry(&log);
    registry.register("default", ["clean"], RecordingAction::new(&log).arc())?;
    registry.set_follow_ups("default", ["styles"])?;
    let orchestrator = Orchestrator::new(registry);

    let reports = with_timeout(orchestrator.run_reports(&["default"])).await?;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].succeeded, vec!["clean", "default"]);
    assert_eq!(reports[1].targets, vec!["styles"]);
    assert!(reports[1].run_id > reports[0].run_id);
    assert!(index(&log, "default") < index(&log, "sass"));
    Ok(())
}

#[tokio::test]
async fn plan_is_available_without_running() -> TestResult {
    let log = invocation_log();
    let orchestrator = Orchestrator::new(styles_registry(&log));

    let plan = orchestrator.plan(&["styles", "clean"])?;
    assert_eq!(plan.order(), &["sass", "old-ie", "styles", "clean"]);
    assert!(log.lock().unwrap().is_empty());
    Ok(())
}
