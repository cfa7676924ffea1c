// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskpipeError};

/// Read and deserialize `path` without any semantic checks.
///
/// A `[task.<name>]` table declared twice is reported like a duplicate
/// registration rather than as a TOML syntax error.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let raw: RawConfigFile = match toml::from_str(&text) {
        Ok(raw) => raw,
        Err(err) => {
            return Err(match duplicate_task_table(&text) {
                Some(name) => TaskpipeError::duplicate_task(&name),
                None => err.into(),
            });
        }
    };
    debug!(
        path = %path.display(),
        tasks = raw.task.len(),
        watch = raw.watch.len(),
        "parsed config file"
    );
    Ok(raw)
}

/// First task name with more than one `[task.<name>]` header.
fn duplicate_task_table(text: &str) -> Option<String> {
    let header = Regex::new(r#"(?m)^\s*\[\s*task\s*\.\s*(?:"([^"]+)"|'([^']+)'|([A-Za-z0-9_-]+))\s*\]"#)
        .ok()?;
    let mut seen: Vec<String> = Vec::new();
    for caps in header.captures_iter(text) {
        let name = caps.get(1).or(caps.get(2)).or(caps.get(3))?.as_str().to_string();
        if seen.contains(&name) {
            return Some(name);
        }
        seen.push(name);
    }
    None
}

/// [`load_from_path`] followed by validation (see `validate.rs`).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// Project root for a config path: every `src`, `dest`, `clean` and watch
/// pattern is relative to it.
///
/// A bare file name (parent = "") resolves to the current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
