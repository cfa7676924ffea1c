// src/pipeline/stages/report.rs

//! Stages that only report on the batch.

use std::sync::Arc;

use tracing::info;

use crate::engine::TaskName;
use crate::errors::StageError;
use crate::notifier::Notifier;
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Logs how many records passed and their total size.
#[derive(Debug, Clone, Default)]
pub struct SizeStage {
    title: Option<String>,
}

impl SizeStage {
    pub fn new(title: Option<String>) -> Self {
        Self { title }
    }
}

impl Stage for SizeStage {
    fn name(&self) -> &str {
        "size"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let bytes: usize = records.iter().map(|r| r.contents.len()).sum();
            info!(
                title = self.title.as_deref().unwrap_or(""),
                files = records.len(),
                bytes,
                "size"
            );
            Ok::<_, StageError>(records)
        })
    }
}

/// Sends one desktop notification per invocation, however many records
/// pass through.
#[derive(Debug, Clone)]
pub struct NotifyStage {
    task: TaskName,
    message: String,
    notifier: Arc<dyn Notifier>,
}

impl NotifyStage {
    pub fn new(task: impl Into<TaskName>, message: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            task: task.into(),
            message: message.into(),
            notifier,
        }
    }
}

impl Stage for NotifyStage {
    fn name(&self) -> &str {
        "notify"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            let title = format!("taskpipe: {}", self.task);
            self.notifier.notify(&title, &self.message).await;
            Ok::<_, StageError>(records)
        })
    }
}
