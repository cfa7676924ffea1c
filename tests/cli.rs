// tests/cli.rs

use std::fs;

use clap::Parser;
use taskpipe::cli::{CliArgs, LogLevel};
use taskpipe::errors::TaskpipeError;
use taskpipe::logging::level_directive;

#[test]
fn no_tasks_means_default() {
    let args = CliArgs::try_parse_from(["taskpipe"]).unwrap();
    assert_eq!(args.targets(), vec!["default"]);
    assert_eq!(args.config, "Taskpipe.toml");
    assert!(!args.once);
    assert!(!args.dry_run);
    assert_eq!(args.log_level, None);
}

#[test]
fn positional_tasks_and_flags() {
    let args = CliArgs::try_parse_from([
        "taskpipe",
        "styles",
        "scripts",
        "--once",
        "--config",
        "web/Taskpipe.toml",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.targets(), vec!["styles", "scripts"]);
    assert_eq!(args.config, "web/Taskpipe.toml");
    assert!(args.once);
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert_eq!(level_directive(LogLevel::Debug), "debug");
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["taskpipe", "--log-level", "loud"]).is_err());
}

#[tokio::test]
async fn dry_run_validates_without_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Taskpipe.toml");
    fs::write(
        &config,
        r#"
[config]
notifications = false

[task.clean]
clean = ["dist"]

[task.default]
after = ["clean"]
"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("dist")).unwrap();

    let args = CliArgs::try_parse_from([
        "taskpipe",
        "--dry-run",
        "--config",
        config.to_str().unwrap(),
    ])
    .unwrap();
    taskpipe::run(args).await.unwrap();

    assert!(dir.path().join("dist").is_dir());
}

#[tokio::test]
async fn once_reports_unknown_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Taskpipe.toml");
    fs::write(&config, "[config]\nnotifications = false\n\n[task.default]\n").unwrap();

    let args = CliArgs::try_parse_from([
        "taskpipe",
        "deploy",
        "--once",
        "--config",
        config.to_str().unwrap(),
    ])
    .unwrap();
    let err = taskpipe::run(args).await.unwrap_err();
    assert!(matches!(err, TaskpipeError::UnknownTask(_)), "{err:?}");
}
