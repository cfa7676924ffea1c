// src/pipeline/build.rs

//! Building the task registry from a validated config.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigFile, StageConfig, TaskConfig};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::notifier::Notifier;
use crate::pipeline::stages::css::browsers_from_config;
use crate::pipeline::stages::{
    AutoprefixStage, ConcatStage, DestStage, ExecStage, LintStage, MinifyCssStage, NotifyStage,
    OptimizeImageStage, PxremStage, RenameStage, SizeStage, SourceMapsStage,
};
use crate::pipeline::{CleanAction, PipelineAction, Stage, StageContext};
use crate::registry::{GroupAction, TaskAction, TaskRegistry};

/// Instantiate one configured stage.
pub fn build_stage(cfg: &StageConfig, ctx: &StageContext) -> Result<Box<dyn Stage>> {
    let stage: Box<dyn Stage> = match cfg {
        StageConfig::Lint { cmd } => Box::new(LintStage::new(
            cmd.clone(),
            ctx.root.clone(),
            Arc::clone(&ctx.fs),
        )),
        StageConfig::Exec {
            cmd,
            extension,
            keep_source_map,
        } => Box::new(
            ExecStage::new(cmd.clone(), extension.clone()).keep_source_map(*keep_source_map),
        ),
        StageConfig::Autoprefix { browsers } => {
            Box::new(AutoprefixStage::new(browsers_from_config(browsers)?))
        }
        StageConfig::MinifyCss => Box::new(MinifyCssStage),
        StageConfig::Pxrem {
            root_value,
            replace,
        } => Box::new(PxremStage::new(root_value, *replace)?),
        StageConfig::Rename {
            prefix,
            suffix,
            basename,
            extname,
        } => Box::new(RenameStage {
            prefix: prefix.clone(),
            suffix: suffix.clone(),
            basename: basename.clone(),
            extname: extname.clone(),
        }),
        StageConfig::Concat { file, source_map } => {
            Box::new(ConcatStage::new(file.clone(), *source_map))
        }
        StageConfig::SourceMaps { dir } => Box::new(SourceMapsStage::new(dir.clone())),
        StageConfig::OptimizeImage { jpeg_quality } => {
            Box::new(OptimizeImageStage::new(*jpeg_quality))
        }
        StageConfig::Size { title } => Box::new(SizeStage::new(title.clone())),
        StageConfig::Dest { dir } => Box::new(DestStage::new(
            ctx.root.clone(),
            dir.clone(),
            Arc::clone(&ctx.fs),
        )),
        StageConfig::Notify { message } => Box::new(NotifyStage::new(
            ctx.task.clone(),
            message.clone(),
            Arc::clone(&ctx.notifier),
        )),
    };
    Ok(stage)
}

/// The action a `[task.<name>]` entry describes.
pub fn build_action(
    name: &str,
    task: &TaskConfig,
    root: &Path,
    fs: &Arc<dyn FileSystem>,
    notifier: &Arc<dyn Notifier>,
) -> Result<Arc<dyn TaskAction>> {
    if !task.clean.is_empty() {
        return Ok(Arc::new(CleanAction::new(
            root,
            Arc::clone(fs),
            task.clean.clone(),
        )));
    }

    if task.src.is_empty() {
        return Ok(Arc::new(GroupAction));
    }

    let ctx = StageContext::new(root, Arc::clone(fs), Arc::clone(notifier), name);
    let stages = task
        .stages
        .iter()
        .map(|s| build_stage(s, &ctx))
        .collect::<Result<Vec<_>>>()?;

    Ok(Arc::new(PipelineAction::new(
        root,
        Arc::clone(fs),
        task.src.clone(),
        task.exclude.clone(),
        stages,
    )))
}

/// Register every configured task (with its `after` and `then` lists).
pub fn registry_from_config(
    cfg: &ConfigFile,
    root: &Path,
    fs: Arc<dyn FileSystem>,
    notifier: Arc<dyn Notifier>,
) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    for (name, task) in cfg.tasks() {
        let action = build_action(name, task, root, &fs, &notifier)?;
        registry.register(name.clone(), task.after.iter().cloned(), action)?;
        if !task.then.is_empty() {
            registry.set_follow_ups(name, task.then.iter().cloned())?;
        }
        debug!(task = %name, stages = task.stages.len(), "built task from config");
    }

    Ok(registry)
}
