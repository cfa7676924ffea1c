// tests/watch_handler.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use taskpipe::dag::DagGraph;
use taskpipe::fs::FileSystem;
use taskpipe::fs::mock::MockFileSystem;
use taskpipe::registry::{GroupAction, TaskRegistry};
use taskpipe::watch::patterns::collect_matching_files;
use taskpipe::watch::{
    BindingProfile, WatchBinding, WatchEventHandler, bindings_from_config, build_globset,
    compile_bindings,
};
use taskpipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use taskpipe_test_utils::init_tracing;

fn graph() -> DagGraph {
    let mut registry = TaskRegistry::new();
    for (name, deps) in [
        ("sass", vec![]),
        ("old-ie", vec![]),
        ("styles", vec!["sass", "old-ie"]),
        ("scripts", vec![]),
    ] {
        registry.register(name, deps, Arc::new(GroupAction)).unwrap();
    }
    DagGraph::from_registry(&registry)
}

fn handler(fs: &MockFileSystem, bindings: &[WatchBinding]) -> WatchEventHandler {
    WatchEventHandler::new(
        ".",
        Arc::new(fs.clone()),
        compile_bindings(bindings).unwrap(),
        graph(),
    )
}

fn default_bindings() -> Vec<WatchBinding> {
    vec![
        WatchBinding::new("sass", ["app/scss/**/*.scss"]),
        WatchBinding::new("styles", ["app/scss/**/*.scss"]),
        WatchBinding::new("scripts", ["app/js/**/*.js"]).with_exclude(["app/js/vendor/**"]),
    ]
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[test]
fn burst_of_changes_triggers_the_bound_task_once() {
    init_tracing();
    let mut h = handler(&MockFileSystem::new(), &default_bindings());

    let decision = h.process_batch(&paths(&[
        "./app/scss/main.scss",
        "./app/scss/partials/_grid.scss",
        "./app/scss/main.scss",
    ]));

    assert_eq!(decision.tasks, vec!["styles"]);
    assert!(decision.reloads.is_empty());
}

#[test]
fn only_the_dependent_task_is_triggered() {
    let mut h = handler(&MockFileSystem::new(), &default_bindings());

    let decision = h.process_batch(&paths(&["./app/js/main.js", "./app/scss/main.scss"]));
    assert_eq!(decision.tasks, vec!["styles", "scripts"]);
}

#[test]
fn unrelated_and_excluded_paths_trigger_nothing() {
    let mut h = handler(&MockFileSystem::new(), &default_bindings());

    let decision = h.process_batch(&paths(&[
        "./app/js/vendor/jquery.js",
        "./README.md",
        "/somewhere/else/main.scss",
    ]));
    assert!(decision.is_empty(), "{decision:?}");
}

#[test]
fn output_changes_go_to_live_reload() {
    let mut h = handler(&MockFileSystem::new(), &default_bindings())
        .with_reload_set(build_globset(&["dist/**".to_string()]).unwrap());

    let decision = h.process_batch(&paths(&["./dist/css/main.css", "./dist/css/main.min.css"]));

    assert!(decision.tasks.is_empty());
    assert_eq!(decision.reloads, vec!["dist/css/main.css", "dist/css/main.min.css"]);
}

#[test]
fn hashed_binding_ignores_touches_without_content_changes() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("./app/scss/main.scss", "a { color: red; }");
    fs.add_file("./app/scss/print.scss", "a { color: black; }");

    let bindings = vec![WatchBinding::new("sass", ["app/scss/*.scss"]).with_hash(true)];
    let mut h = handler(&fs, &bindings);
    h.prime_hashes();

    let touched = paths(&["./app/scss/main.scss"]);
    assert!(h.process_batch(&touched).tasks.is_empty());

    fs.add_file("./app/scss/main.scss", "a { color: blue; }");
    assert_eq!(h.process_batch(&touched).tasks, vec!["sass"]);

    // Same contents again: nothing new to build.
    assert!(h.process_batch(&touched).tasks.is_empty());
}

#[test]
fn config_bindings_get_default_excludes() {
    let cfg = ConfigFileBuilder::new()
        .with_task("scripts", TaskConfigBuilder::group().build())
        .with_watch("scripts", &["app/js/**/*.js"])
        .with_default_exclude("**/*.min.js")
        .build();

    let bindings = bindings_from_config(&cfg);
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].exclude, vec!["**/*.min.js"]);

    let mut h = handler(&MockFileSystem::new(), &bindings);
    assert!(h.process_batch(&paths(&["./app/js/lib.min.js"])).is_empty());
    assert_eq!(h.process_batch(&paths(&["./app/js/lib.js"])).tasks, vec!["scripts"]);
}

#[test]
fn invalid_binding_glob_is_an_error() {
    let bindings = vec![WatchBinding::new("sass", ["app/[scss"])];
    assert!(compile_bindings(&bindings).is_err());
}

/// Mock filesystem that remembers which directories were listed.
#[derive(Debug, Default)]
struct ListingLog {
    inner: MockFileSystem,
    listed: Mutex<Vec<PathBuf>>,
}

impl FileSystem for ListingLog {
    fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        self.inner.read(path)
    }
    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }
    fn remove(&self, path: &Path) -> anyhow::Result<bool> {
        self.inner.remove(path)
    }
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }
    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.listed.lock().unwrap().push(path.to_path_buf());
        self.inner.read_dir(path)
    }
}

#[test]
fn hashed_files_are_collected_from_the_glob_bases_only() {
    let fs = ListingLog::default();
    fs.inner.add_file("./app/scss/main.scss", "a{}");
    fs.inner.add_file("./app/scss/partials/_grid.scss", "b{}");
    fs.inner.add_file("./spec/scss/test.scss", "c{}");
    fs.inner.add_file("./node_modules/pkg/index.scss", "d{}");
    fs.inner.add_file("./dist/css/main.css", "a{}");

    let binding = WatchBinding::new(
        "sass",
        ["app/scss/**/*.scss", "./app/scss/partials/*.scss", "spec/scss/test.scss"],
    );
    let profile = BindingProfile::compile(&binding).unwrap();
    assert_eq!(
        profile.bases(),
        &[PathBuf::from("app/scss"), PathBuf::from("spec/scss")]
    );

    let files = collect_matching_files(&fs, Path::new("."), &profile).unwrap();
    assert_eq!(
        files,
        paths(&[
            "./app/scss/main.scss",
            "./app/scss/partials/_grid.scss",
            "./spec/scss/test.scss",
        ])
    );

    let listed = fs.listed.lock().unwrap();
    assert!(!listed.is_empty());
    for dir in listed.iter() {
        assert!(
            dir.starts_with("./app/scss") || dir.starts_with("./spec/scss"),
            "walked outside the watched bases: {}",
            dir.display()
        );
    }
}
