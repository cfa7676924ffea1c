// src/pipeline/stages/concat.rs

use std::path::PathBuf;

use tracing::debug;

use crate::errors::StageError;
use crate::pipeline::{FileRecord, SourceMap, Stage, StageFuture};

/// Joins the whole batch, in order, into a single record named `file`,
/// separated by `"\n"`. The only stage that does not keep one record per
/// input. An empty batch stays empty.
#[derive(Debug, Clone)]
pub struct ConcatStage {
    file: PathBuf,
    source_map: bool,
}

impl ConcatStage {
    pub fn new(file: impl Into<PathBuf>, source_map: bool) -> Self {
        Self {
            file: file.into(),
            source_map,
        }
    }
}

impl Stage for ConcatStage {
    fn name(&self) -> &str {
        "concat"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let Some(first) = records.first() else {
                return Ok(records);
            };
            let base = first.base.clone();

            let mut contents = Vec::new();
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    contents.push(b'\n');
                }
                contents.extend_from_slice(&record.contents);
            }

            let mut joined = FileRecord::new(base, self.file.clone(), contents);

            if self.source_map {
                let inputs = records
                    .iter()
                    .map(|r| Ok((r.relative_str(), r.text(self.name())?.to_string())))
                    .collect::<Result<Vec<_>, StageError>>()?;
                joined.source_map = Some(SourceMap::for_concatenation(joined.file_name(), &inputs));
            }

            debug!(
                inputs = records.len(),
                file = %joined.path().display(),
                bytes = joined.contents.len(),
                "concatenated"
            );
            Ok::<_, StageError>(vec![joined])
        })
    }
}
