// tests/watch_e2e.rs

use std::fs;
use std::time::Duration;

use taskpipe::orchestrator::{Orchestrator, WatchOptions};
use taskpipe::registry::TaskRegistry;
use taskpipe::watch::WatchBinding;
use taskpipe_test_utils::init_tracing;
use taskpipe_test_utils::recording::{RecordingAction, invocation_log};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burst_of_saves_runs_the_bound_task_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let scss = dir.path().join("app/scss");
    fs::create_dir_all(&scss).unwrap();
    fs::write(scss.join("main.scss"), "a { color: red; }").unwrap();

    let log = invocation_log();
    let mut registry = TaskRegistry::new();
    registry
        .register("styles", Vec::<String>::new(), RecordingAction::new(&log).arc())
        .unwrap();

    let options = WatchOptions {
        debounce: Duration::from_millis(300),
        ..WatchOptions::default()
    };

    let shutdown = {
        let log = log.clone();
        let scss = scss.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            for name in ["main.scss", "_grid.scss", "_type.scss"] {
                fs::write(scss.join(name), "a { color: blue; }").unwrap();
            }
            for _ in 0..50 {
                if !log.lock().unwrap().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            // Give a stray second batch time to show up.
            tokio::time::sleep(Duration::from_millis(800)).await;
        }
    };

    let reports = Orchestrator::new(registry)
        .watch_until(
            dir.path(),
            vec![WatchBinding::new("styles", ["app/scss/**/*.scss"])],
            options,
            shutdown,
        )
        .await
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["styles"]);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_success());
}
