// src/pipeline/mod.rs

//! File pipelines.
//!
//! A pipeline task matches its `src` globs into an ordered batch of
//! [`FileRecord`]s and hands the batch to each [`Stage`] in declaration
//! order. A stage receives the complete output of the previous one, so a
//! stage that fails (for example a linter reporting violations) stops the
//! pipeline before any later `dest` stage writes.
//!
//! - [`source`] turns globs into records.
//! - [`stages`] holds the built-in stage kinds.
//! - [`sourcemap`] is the v3 source map model used by `concat` and
//!   `source-maps`.
//! - [`action`] wires sources and stages into task actions.
//! - [`build`] builds a [`TaskRegistry`](crate::registry::TaskRegistry)
//!   from a validated config.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::errors::StageError;
use crate::fs::FileSystem;
use crate::notifier::Notifier;

pub mod action;
pub mod build;
pub mod source;
pub mod sourcemap;
pub mod stages;

pub use action::{CleanAction, PipelineAction};
pub use build::{build_stage, registry_from_config};
pub use sourcemap::SourceMap;

/// One file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Literal directory prefix of the glob that matched the file, relative
    /// to the project root (e.g. `app/scss` for `app/scss/*.scss`).
    pub base: PathBuf,
    /// Path below `base`. `dest` writes to `<dir>/<relative>`.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
    pub source_map: Option<SourceMap>,
}

impl FileRecord {
    pub fn new(
        base: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            base: base.into(),
            relative: relative.into(),
            contents: contents.into(),
            source_map: None,
        }
    }

    /// Path relative to the project root.
    pub fn path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    /// Forward-slash form of `relative`, as used in source maps and logs.
    pub fn relative_str(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }

    pub fn file_name(&self) -> String {
        self.relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Contents as UTF-8 text, or a stage failure naming the file.
    pub fn text(&self, stage: &str) -> Result<&str, StageError> {
        std::str::from_utf8(&self.contents).map_err(|_| {
            StageError::failed(
                stage,
                format!("{} is not valid UTF-8", self.path().display()),
            )
        })
    }
}

pub type StageFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<FileRecord>, StageError>> + Send + 'a>>;

/// One transformation step. Receives the whole ordered batch produced by
/// the previous stage and returns the batch for the next one.
pub trait Stage: Send + Sync + fmt::Debug {
    /// Stage kind, used in logs and errors.
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a>;
}

/// What stages get to see of their surroundings when they are built.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Project root; `dest` and `clean` paths are relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Arc<dyn Notifier>,
    /// Task that owns the pipeline.
    pub task: TaskName,
}

impl StageContext {
    pub fn new(
        root: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn Notifier>,
        task: impl Into<TaskName>,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            fs,
            notifier,
            task: task.into(),
        }
    }
}
