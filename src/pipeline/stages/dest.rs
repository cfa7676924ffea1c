// src/pipeline/stages/dest.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::StageError;
use crate::fs::FileSystem;
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Writes every record to `<root>/<dir>/<relative>`, replacing whatever was
/// there. Records pass through unchanged so later stages can keep working
/// on them (`dest` then `rename` then `minify-css` then `dest`).
#[derive(Debug, Clone)]
pub struct DestStage {
    root: PathBuf,
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl DestStage {
    pub fn new(root: impl Into<PathBuf>, dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            dir: dir.into(),
            fs,
        }
    }

    pub fn target_for(&self, record: &FileRecord) -> PathBuf {
        self.root.join(&self.dir).join(&record.relative)
    }
}

impl Stage for DestStage {
    fn name(&self) -> &str {
        "dest"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let fs = Arc::clone(&self.fs);
            let writes: Vec<(PathBuf, FileRecord)> = records
                .into_iter()
                .map(|record| (self.target_for(&record), record))
                .collect();

            let records = tokio::task::spawn_blocking(move || {
                let mut out = Vec::with_capacity(writes.len());
                for (target, record) in writes {
                    fs.write(&target, &record.contents).map_err(|e| {
                        StageError::failed("dest", format!("{e:#}"))
                    })?;
                    debug!(file = %target.display(), bytes = record.contents.len(), "written");
                    out.push(record);
                }
                Ok::<_, StageError>(out)
            })
            .await
            .map_err(|e| StageError::failed("dest", e))??;

            info!(dir = %self.dir.display(), files = records.len(), "dest");
            Ok::<_, StageError>(records)
        })
    }
}
