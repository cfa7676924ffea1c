// src/pipeline/action.rs

//! Task actions built from config: file pipelines and `clean`.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::StageError;
use crate::fs::FileSystem;
use crate::pipeline::source::collect_sources;
use crate::pipeline::{FileRecord, Stage};
use crate::registry::{ActionContext, ActionFuture, ActionReport, TaskAction};

/// Reads `src` (minus `exclude`) and runs the records through `stages`.
#[derive(Debug)]
pub struct PipelineAction {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    src: Vec<String>,
    exclude: Vec<String>,
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineAction {
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        src: Vec<String>,
        exclude: Vec<String>,
        stages: Vec<Box<dyn Stage>>,
    ) -> Self {
        Self {
            root: root.into(),
            fs,
            src,
            exclude,
            stages,
        }
    }

    async fn read_sources(&self) -> Result<Vec<FileRecord>, StageError> {
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let src = self.src.clone();
        let exclude = self.exclude.clone();

        tokio::task::spawn_blocking(move || collect_sources(fs.as_ref(), &root, &src, &exclude))
            .await
            .map_err(|e| StageError::failed("src", e))?
            .map_err(|e| StageError::failed("src", format!("{e:#}")))
    }

    /// Run every stage in order over the matched files.
    pub async fn execute(&self, ctx: &ActionContext) -> Result<Vec<FileRecord>, StageError> {
        let mut records = self.read_sources().await?;
        debug!(task = %ctx.task, files = records.len(), "sources read");

        for stage in &self.stages {
            let before = records.len();
            records = stage.apply(records).await?;
            debug!(
                task = %ctx.task,
                run_id = ctx.run_id,
                stage = stage.name(),
                before,
                after = records.len(),
                "stage done"
            );
        }

        Ok(records)
    }
}

impl TaskAction for PipelineAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let records = self.execute(ctx).await?;
            Ok::<_, StageError>(ActionReport {
                records: records.len(),
                removed: 0,
            })
        })
    }
}

/// Removes files and directories (relative to the project root). Missing
/// paths are skipped.
#[derive(Debug)]
pub struct CleanAction {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    paths: Vec<String>,
}

impl CleanAction {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, paths: Vec<String>) -> Self {
        Self {
            root: root.into(),
            fs,
            paths,
        }
    }
}

impl TaskAction for CleanAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let fs = Arc::clone(&self.fs);
            let targets: Vec<PathBuf> = self.paths.iter().map(|p| self.root.join(p)).collect();

            let removed = tokio::task::spawn_blocking(move || {
                let mut removed = 0;
                for target in &targets {
                    if fs
                        .remove(target)
                        .map_err(|e| StageError::failed("clean", format!("{e:#}")))?
                    {
                        debug!(path = %target.display(), "removed");
                        removed += 1;
                    }
                }
                Ok::<_, StageError>(removed)
            })
            .await
            .map_err(|e| StageError::failed("clean", e))??;

            info!(task = %ctx.task, removed, "clean");
            Ok::<_, StageError>(ActionReport {
                records: 0,
                removed,
            })
        })
    }
}
