// tests/config_validation.rs

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use taskpipe::config::{StageConfig, load_and_validate};
use taskpipe::engine::OverlapPolicy;
use taskpipe::errors::TaskpipeError;
use taskpipe::fs::mock::MockFileSystem;
use taskpipe::notifier::LogNotifier;
use taskpipe::pipeline::registry_from_config;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn load(contents: &str) -> taskpipe::errors::Result<taskpipe::config::ConfigFile> {
    let file = write_config(contents);
    load_and_validate(file.path())
}

const FULL: &str = r#"
[config]
on_overlap = "replace"
queue_length = 3
debounce_ms = 250

[defaults]
exclude = ["**/*.swp"]

[livereload]
port = 35730
watch = ["dist/**/*.css", "*.html"]

[task.sass]
src = ["app/scss/*.scss"]
stages = [
  { kind = "autoprefix" },
  { kind = "pxrem", root_value = "10px" },
  { kind = "dest", dir = "dist/css" },
  { kind = "minify-css" },
  { kind = "rename", suffix = ".min" },
  { kind = "dest", dir = "dist/css" },
  { kind = "notify", message = "styles built" },
]

[task.old-ie]
src = ["app/scss/ie.scss"]

[task.styles]
after = ["sass", "old-ie"]

[task.clean]
clean = ["dist"]
then = ["styles"]

[[watch]]
paths = ["app/scss/**/*.scss"]
task = "styles"
use_hash = true
"#;

#[test]
fn full_config_loads_with_defaults_applied() {
    let cfg = load(FULL).unwrap();

    assert_eq!(cfg.config().on_overlap, OverlapPolicy::Replace);
    assert_eq!(cfg.config().queue_length, 3);
    assert_eq!(cfg.config().debounce_ms, 250);
    assert!(cfg.config().notifications);

    assert!(cfg.livereload().enabled);
    assert_eq!(cfg.livereload().host, "127.0.0.1");
    assert_eq!(cfg.livereload().port, 35730);

    let sass = &cfg.tasks()["sass"];
    assert_eq!(sass.stages.len(), 7);
    assert_eq!(
        sass.stages[1],
        StageConfig::Pxrem {
            root_value: "10px".to_string(),
            replace: true,
        }
    );
    assert_eq!(cfg.tasks()["styles"].after, vec!["sass", "old-ie"]);
    assert_eq!(cfg.tasks()["clean"].then, vec!["styles"]);

    let watch = cfg.watch_bindings();
    assert_eq!(watch.len(), 1);
    assert!(watch[0].use_hash);
}

#[test]
fn minimal_config_uses_defaults() {
    let cfg = load("[task.default]\n").unwrap();

    assert_eq!(cfg.config().on_overlap, OverlapPolicy::Queue);
    assert_eq!(cfg.config().queue_length, 1);
    assert_eq!(cfg.config().debounce_ms, 100);
    assert_eq!(cfg.livereload().port, 35729);
    assert_eq!(cfg.livereload().watch, vec!["dist/**"]);
    assert!(cfg.watch_bindings().is_empty());
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = load("[task.styles]\nafter = [\"sass\"]\n").unwrap_err();
    match err {
        TaskpipeError::ConfigError(msg) => assert!(msg.contains("'sass'"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn dependency_cycle_is_rejected() {
    let err = load(
        r#"
[task.a]
after = ["b"]

[task.b]
after = ["a"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskpipeError::DependencyCycle(_)), "{err:?}");
}

#[test]
fn follow_up_loop_is_rejected() {
    let err = load(
        r#"
[task.a]
then = ["b"]

[task.b]
then = ["a"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn watch_binding_for_unknown_task_is_rejected() {
    let err = load(
        r#"
[task.styles]

[[watch]]
paths = ["app/scss/**/*.scss"]
task = "scripts"
"#,
    )
    .unwrap_err();
    match err {
        TaskpipeError::ConfigError(msg) => assert!(msg.contains("'scripts'"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_queue_length_is_rejected() {
    let err = load("[config]\nqueue_length = 0\n\n[task.a]\n").unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn unknown_stage_kind_is_a_parse_error() {
    let err = load(
        r#"
[task.sass]
src = ["app/scss/*.scss"]
stages = [{ kind = "uglify" }]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskpipeError::TomlError(_)), "{err:?}");
}

#[test]
fn stages_without_src_are_rejected() {
    let err = load("[task.sass]\nstages = [{ kind = \"minify-css\" }]\n").unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn clean_paths_cannot_escape_the_project() {
    let err = load("[task.clean]\nclean = [\"../elsewhere\"]\n").unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn empty_config_is_rejected() {
    let err = load("[config]\ndebounce_ms = 50\n").unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("Taskpipe.toml")).unwrap_err();
    assert!(matches!(err, TaskpipeError::IoError(_)), "{err:?}");
}

#[test]
fn duplicate_task_table_is_a_config_error() {
    let err = load(
        r#"
[task.sass]
src = ["app/scss/*.scss"]

[task.scripts]

[task.sass]
src = ["app/scss/ie.scss"]
"#,
    )
    .unwrap_err();
    match err {
        TaskpipeError::ConfigError(msg) => {
            assert_eq!(msg, "task 'sass' is already registered")
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn other_syntax_errors_stay_toml_errors() {
    let err = load("[task.sass]\nsrc = [\n").unwrap_err();
    assert!(matches!(err, TaskpipeError::TomlError(_)), "{err:?}");
}

#[test]
fn tasks_keep_their_declaration_order() {
    let cfg = load(
        r#"
[task.zeta]

[task.alpha]
after = ["zeta"]

[task.mid]
"#,
    )
    .unwrap();

    let declared: Vec<&str> = cfg.tasks().keys().map(String::as_str).collect();
    assert_eq!(declared, vec!["zeta", "alpha", "mid"]);

    let registry = registry_from_config(
        &cfg,
        Path::new("."),
        Arc::new(MockFileSystem::new()),
        Arc::new(LogNotifier),
    )
    .unwrap();
    let registered: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(registered, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn demo_project_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Taskpipe.toml");
    let cfg = load_and_validate(&path).unwrap();

    let declared: Vec<&str> = cfg.tasks().keys().map(String::as_str).collect();
    assert_eq!(
        declared,
        vec!["default", "clean", "sass-test", "styles", "sass", "old-ie", "scripts", "images"]
    );
    assert_eq!(cfg.tasks()["default"].after, vec!["clean"]);
    assert_eq!(cfg.tasks()["default"].then, vec!["styles", "images", "scripts"]);
    assert_eq!(cfg.watch_bindings().len(), 3);
}
