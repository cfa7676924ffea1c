// src/pipeline/stages/external.rs

//! Stages backed by external programs: linters and stdin/stdout filters
//! (`sass --stdin`, `terser`, ...).

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::errors::StageError;
use crate::exec::command::run_with_stdin;
use crate::fs::FileSystem;
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Placeholder replaced by a path holding the record's current contents.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Runs a linter over every record.
///
/// With `{file}` in `cmd` the linter gets a path: the record's source file
/// under the project root while it still holds the record's contents,
/// otherwise a temporary copy carrying the record's current file name.
/// Without the placeholder the contents are piped to its stdin. Any
/// non-zero exit counts as a violation. All records are checked before the
/// stage fails, so the error lists every offending file.
#[derive(Debug, Clone)]
pub struct LintStage {
    cmd: String,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LintStage {
    pub fn new(cmd: impl Into<String>, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            cmd: cmd.into(),
            root: root.into(),
            fs,
        }
    }

    /// Path the linter should read `record` from. The returned directory
    /// must outlive the linter run.
    async fn lint_target(
        &self,
        record: &FileRecord,
    ) -> Result<(PathBuf, Option<TempDir>), StageError> {
        let on_disk = self.root.join(record.path());
        if self.fs.read(&on_disk).is_ok_and(|c| c == record.contents) {
            return Ok((on_disk, None));
        }

        let dir = tempfile::Builder::new()
            .prefix("taskpipe-lint-")
            .tempdir()
            .map_err(|e| StageError::failed(self.name(), e))?;
        let copy = dir.path().join(record.file_name());
        tokio::fs::write(&copy, &record.contents)
            .await
            .map_err(|e| StageError::failed(self.name(), e))?;
        debug!(file = %record.path().display(), copy = %copy.display(), "linting a temporary copy");
        Ok((copy, Some(dir)))
    }
}

impl Stage for LintStage {
    fn name(&self) -> &str {
        "lint"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let mut violations = Vec::new();

            for record in &records {
                let path = record.path();
                let mut copy = None;
                let (cmdline, input) = if self.cmd.contains(FILE_PLACEHOLDER) {
                    let (target, dir) = self.lint_target(record).await?;
                    let target = target.to_string_lossy().into_owned();
                    let cmdline = self.cmd.replace(FILE_PLACEHOLDER, &target);
                    if dir.is_some() {
                        copy = Some((target, dir));
                    }
                    (cmdline, Vec::new())
                } else {
                    (self.cmd.clone(), record.contents.clone())
                };

                let output = run_with_stdin(&cmdline, input)
                    .await
                    .map_err(|e| StageError::failed(self.name(), format!("{e:#}")))?;

                if output.status.success() {
                    debug!(file = %path.display(), "lint clean");
                    continue;
                }

                let shown = path.display().to_string();
                let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .chain(String::from_utf8_lossy(&output.stderr).lines())
                    .map(str::trim_end)
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| match &copy {
                        Some((target, _)) => l.replace(target.as_str(), &shown),
                        None => l.to_string(),
                    })
                    .map(|l| format!("{shown}: {l}"))
                    .collect();
                if lines.is_empty() {
                    lines.push(format!(
                        "{shown}: linter exited with code {}",
                        output.status.code().unwrap_or(-1)
                    ));
                }
                violations.extend(lines);
            }

            if !violations.is_empty() {
                return Err(StageError::Violations {
                    stage: self.name().to_string(),
                    violations,
                });
            }

            info!(files = records.len(), "lint passed");
            Ok::<_, StageError>(records)
        })
    }
}

/// Pipes every record through `cmd` (stdin -> stdout).
///
/// An attached source map stays with the record, pointing at the original
/// sources line by line, unless the stage is built with
/// `keep_source_map(false)`.
#[derive(Debug, Clone)]
pub struct ExecStage {
    cmd: String,
    extension: Option<String>,
    keep_source_map: bool,
}

impl ExecStage {
    pub fn new(cmd: impl Into<String>, extension: Option<String>) -> Self {
        Self {
            cmd: cmd.into(),
            extension: extension.map(|e| e.trim_start_matches('.').to_string()),
            keep_source_map: true,
        }
    }

    pub fn keep_source_map(mut self, keep: bool) -> Self {
        self.keep_source_map = keep;
        self
    }
}

impl Stage for ExecStage {
    fn name(&self) -> &str {
        "exec"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(records.len());

            for mut record in records {
                let output = run_with_stdin(&self.cmd, std::mem::take(&mut record.contents))
                    .await
                    .map_err(|e| StageError::failed(self.name(), format!("{e:#}")))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(StageError::failed(
                        self.name(),
                        format!(
                            "`{}` failed on {} (exit code {}): {}",
                            self.cmd,
                            record.path().display(),
                            output.status.code().unwrap_or(-1),
                            stderr.trim()
                        ),
                    ));
                }

                record.contents = output.stdout;
                if !self.keep_source_map && record.source_map.take().is_some() {
                    debug!(file = %record.path().display(), "dropping source map after exec");
                }
                if let Some(ext) = &self.extension {
                    record.relative.set_extension(ext);
                    let file_name = record.file_name();
                    if let Some(map) = record.source_map.as_mut() {
                        map.file = file_name;
                    }
                }
                out.push(record);
            }

            Ok::<_, StageError>(out)
        })
    }
}
