// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::pipeline::source::{glob_base, to_slash, walk_files};

/// A watch binding: re-run `task` when a file matching `paths` (and not
/// `exclude`) changes.
///
/// ```toml
/// [[watch]]
/// paths = ["app/scss/**/*.scss"]
/// task = "styles"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub task: TaskName,
    pub paths: Vec<String>,
    pub exclude: Vec<String>,
    /// Only trigger when the contents of the watched files changed.
    pub use_hash: bool,
}

impl WatchBinding {
    pub fn new<N: Into<TaskName>, S: Into<String>>(
        task: N,
        paths: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            task: task.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
            use_hash: false,
        }
    }

    pub fn with_exclude<S: Into<String>>(mut self, exclude: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(exclude.into_iter().map(Into::into));
        self
    }

    pub fn with_hash(mut self, use_hash: bool) -> Self {
        self.use_hash = use_hash;
        self
    }
}

/// Bindings from `[[watch]]`, each with `[defaults].exclude` appended.
pub fn bindings_from_config(cfg: &ConfigFile) -> Vec<WatchBinding> {
    cfg.watch_bindings()
        .iter()
        .map(|w| {
            WatchBinding::new(w.task.clone(), w.paths.iter().cloned())
                .with_exclude(w.exclude.iter().cloned())
                .with_exclude(cfg.defaults().exclude.iter().cloned())
                .with_hash(w.use_hash)
        })
        .collect()
}

/// Compiled globs of one binding. Paths passed to [`matches`](Self::matches)
/// are relative to the project root with forward slashes.
#[derive(Clone)]
pub struct BindingProfile {
    task: TaskName,
    /// Literal directory prefixes of the watch globs; nothing outside them
    /// can match.
    bases: Vec<PathBuf>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    use_hash: bool,
}

impl fmt::Debug for BindingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingProfile")
            .field("task", &self.task)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl BindingProfile {
    pub fn compile(binding: &WatchBinding) -> Result<Self> {
        let watch_set = build_globset(&binding.paths)
            .with_context(|| format!("building watch globset for task {}", binding.task))?;
        let exclude_set = if binding.exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&binding.exclude)
                    .with_context(|| format!("building exclude globset for task {}", binding.task))?,
            )
        };

        Ok(Self {
            task: binding.task.clone(),
            bases: watch_bases(&binding.paths),
            watch_set,
            exclude_set,
            use_hash: binding.use_hash,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

pub fn compile_bindings(bindings: &[WatchBinding]) -> Result<Vec<BindingProfile>> {
    bindings.iter().map(BindingProfile::compile).collect()
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Base directories for `patterns`, dropping any nested in another base.
fn watch_bases(patterns: &[String]) -> Vec<PathBuf> {
    let mut bases: Vec<PathBuf> = patterns
        .iter()
        .map(|p| glob_base(p.trim_start_matches("./")))
        .collect();
    bases.sort();
    bases.dedup();

    let mut kept: Vec<PathBuf> = Vec::with_capacity(bases.len());
    for base in bases {
        if !kept.iter().any(|k| base.starts_with(k)) {
            kept.push(base);
        }
    }
    kept
}

/// Collect the files under `root` that `profile` matches, walking only the
/// profile's base directories.
///
/// Used to hash the watched set of `use_hash` bindings.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &BindingProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for base in &profile.bases {
        for rel in walk_files(fs, root, base)? {
            if profile.matches(&to_slash(&rel)) {
                files.push(root.join(rel));
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
