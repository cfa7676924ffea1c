// src/pipeline/stages/sourcemaps.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::StageError;
use crate::pipeline::source::normalize;
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Writes attached source maps out as `<name>.map` side records.
///
/// `dir` is relative to each record's own directory (`"."` puts the map
/// next to the file). The map record directly follows its file and the file
/// gets a `sourceMappingURL` comment. Records without a map pass through.
#[derive(Debug, Clone)]
pub struct SourceMapsStage {
    dir: PathBuf,
}

impl SourceMapsStage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn mapping_url_comment(ext: Option<&str>, url: &str) -> String {
    match ext {
        Some("css") => format!("\n/*# sourceMappingURL={url} */\n"),
        _ => format!("\n//# sourceMappingURL={url}\n"),
    }
}

impl Stage for SourceMapsStage {
    fn name(&self) -> &str {
        "source-maps"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(records.len() * 2);

            for mut record in records {
                let Some(mut map) = record.source_map.take() else {
                    out.push(record);
                    continue;
                };

                let file_name = record.file_name();
                let map_name = format!("{file_name}.map");
                let url_path = normalize(&self.dir.join(&map_name));
                let url = url_path.to_string_lossy().replace('\\', "/");
                let map_relative = normalize(
                    &record
                        .relative
                        .parent()
                        .unwrap_or(Path::new(""))
                        .join(&url_path),
                );

                map.file = file_name;
                let json = serde_json::to_vec(&map)
                    .map_err(|e| StageError::failed(self.name(), e))?;

                let ext = record.extension();
                record
                    .contents
                    .extend_from_slice(mapping_url_comment(ext.as_deref(), &url).as_bytes());

                debug!(file = %record.path().display(), map = %map_relative.display(), "source map written");

                let map_record = FileRecord::new(record.base.clone(), map_relative, json);
                out.push(record);
                out.push(map_record);
            }

            Ok::<_, StageError>(out)
        })
    }
}
