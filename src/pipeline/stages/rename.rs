// src/pipeline/stages/rename.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::StageError;
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Renames records in place: `<prefix><basename><suffix><extname>`.
///
/// Only the file name changes; the directory below the base is kept, and
/// so is record order.
#[derive(Debug, Clone, Default)]
pub struct RenameStage {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub basename: Option<String>,
    /// With or without the leading dot; `""` removes the extension.
    pub extname: Option<String>,
}

impl RenameStage {
    pub fn rename(&self, relative: &Path) -> PathBuf {
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = relative
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let basename = self.basename.clone().unwrap_or(stem);
        let extname = match &self.extname {
            Some(e) if e.is_empty() || e.starts_with('.') => e.clone(),
            Some(e) => format!(".{e}"),
            None => ext,
        };

        let name = format!(
            "{}{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            basename,
            self.suffix.as_deref().unwrap_or(""),
            extname
        );

        match relative.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}

impl Stage for RenameStage {
    fn name(&self) -> &str {
        "rename"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            Ok::<_, StageError>(records
                .into_iter()
                .map(|mut record| {
                    let renamed = self.rename(&record.relative);
                    debug!(from = %record.relative.display(), to = %renamed.display(), "renamed");
                    record.relative = renamed;
                    let file_name = record.file_name();
                    if let Some(map) = record.source_map.as_mut() {
                        map.file = file_name;
                    }
                    record
                })
                .collect())
        })
    }
}
