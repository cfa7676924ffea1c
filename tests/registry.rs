// tests/registry.rs

use std::sync::Arc;

use taskpipe::errors::TaskpipeError;
use taskpipe::registry::{GroupAction, TaskRegistry};

fn group() -> Arc<GroupAction> {
    Arc::new(GroupAction)
}

#[test]
fn duplicate_registration_is_a_config_error() {
    let mut registry = TaskRegistry::new();
    registry
        .register("sass", Vec::<String>::new(), group())
        .unwrap();

    let err = registry
        .register("sass", ["clean"], group())
        .unwrap_err();
    assert!(matches!(err, TaskpipeError::ConfigError(_)), "got {err:?}");
    assert_eq!(registry.len(), 1);
}

#[test]
fn empty_or_whitespace_names_are_rejected() {
    let mut registry = TaskRegistry::new();

    for bad in ["", "old ie", "tab\tname"] {
        let err = registry
            .register(bad, Vec::<String>::new(), group())
            .unwrap_err();
        assert!(matches!(err, TaskpipeError::ConfigError(_)), "{bad:?}: {err:?}");
    }
    assert!(registry.is_empty());
}

#[test]
fn duplicate_dependencies_collapse_to_first_occurrence() {
    let mut registry = TaskRegistry::new();
    registry
        .register("styles", ["sass", "old-ie", "sass"], group())
        .unwrap();

    let task = registry.get("styles").unwrap();
    assert_eq!(task.deps, vec!["sass".to_string(), "old-ie".to_string()]);
}

#[test]
fn unknown_dependencies_are_accepted_until_planning() {
    let mut registry = TaskRegistry::new();
    registry.register("styles", ["sass"], group()).unwrap();
    assert!(registry.contains("styles"));
    assert!(!registry.contains("sass"));
}

#[test]
fn iteration_follows_registration_order() {
    let mut registry = TaskRegistry::new();
    for name in ["clean", "sass", "old-ie", "styles"] {
        registry.register(name, Vec::<String>::new(), group()).unwrap();
    }

    let names: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["clean", "sass", "old-ie", "styles"]);
}

#[test]
fn follow_ups_need_a_registered_task() {
    let mut registry = TaskRegistry::new();
    registry.register("clean", Vec::<String>::new(), group()).unwrap();

    registry.set_follow_ups("clean", ["styles", "images"]).unwrap();
    assert_eq!(
        registry.get("clean").unwrap().follow_ups,
        vec!["styles".to_string(), "images".to_string()]
    );

    let err = registry.set_follow_ups("missing", ["styles"]).unwrap_err();
    assert!(matches!(err, TaskpipeError::UnknownTask(name) if name == "missing"));
}
