// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod livereload;
pub mod logging;
pub mod notifier;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, config_root_dir, load_and_validate};
use crate::dag::RunReport;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::notifier::notifier_for;
use crate::orchestrator::{Orchestrator, WatchOptions};
use crate::pipeline::registry_from_config;
use crate::watch::bindings_from_config;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the registry, then either prints
/// the plan (`--dry-run`), runs once (`--once`) or runs and keeps watching.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    let targets = args.targets();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let notifier = notifier_for(cfg.config().notifications);
    let registry = registry_from_config(&cfg, &root, fs, Arc::clone(&notifier))?;
    let orchestrator = Orchestrator::new(registry)
        .with_overlap(cfg.config().on_overlap, cfg.config().queue_length)
        .with_notifier(notifier);

    if args.dry_run {
        print_dry_run(&cfg, &orchestrator, &targets)?;
        return Ok(());
    }

    if args.once {
        let reports = orchestrator.run_reports(&targets).await?;
        info!(runs = reports.len(), "all runs finished");
        return match reports.iter().find_map(RunReport::first_failure) {
            Some(err) => Err(err),
            None => Ok(()),
        };
    }

    let options = WatchOptions::from_config(&cfg, targets)?;
    let reports = orchestrator
        .watch(&root, bindings_from_config(&cfg), options)
        .await?;
    info!(runs = reports.len(), "watch session ended");
    Ok(())
}

/// Print the plan for `targets` and the watch bindings.
fn print_dry_run(cfg: &ConfigFile, orchestrator: &Orchestrator, targets: &[String]) -> Result<()> {
    let plan = orchestrator.plan(targets)?;

    println!("taskpipe dry-run");
    println!("  config.on_overlap = {:?}", cfg.config().on_overlap);
    println!("  config.queue_length = {}", cfg.config().queue_length);
    println!("  config.debounce_ms = {}", cfg.config().debounce_ms);
    println!();

    println!("plan for {targets:?}:");
    for (i, name) in plan.order().iter().enumerate() {
        let Some(task) = cfg.tasks().get(name) else {
            continue;
        };
        println!("  {}. {name}", i + 1);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.then.is_empty() {
            println!("      then: {:?}", task.then);
        }
        if !task.src.is_empty() {
            println!("      src: {:?}", task.src);
        }
        if !task.stages.is_empty() {
            println!("      stages: {}", stage_kinds(task).join(" -> "));
        }
        if !task.clean.is_empty() {
            println!("      clean: {:?}", task.clean);
        }
    }

    let bindings = bindings_from_config(cfg);
    if !bindings.is_empty() {
        println!();
        println!("watch ({}):", bindings.len());
        for binding in bindings {
            println!("  - {:?} -> {}", binding.paths, binding.task);
            if binding.use_hash {
                println!("      use_hash: true");
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn stage_kinds(task: &config::TaskConfig) -> Vec<&'static str> {
    use crate::config::StageConfig::*;

    task.stages
        .iter()
        .map(|stage| match stage {
            Lint { .. } => "lint",
            Exec { .. } => "exec",
            Autoprefix { .. } => "autoprefix",
            MinifyCss => "minify-css",
            Pxrem { .. } => "pxrem",
            Rename { .. } => "rename",
            Concat { .. } => "concat",
            SourceMaps { .. } => "source-maps",
            OptimizeImage { .. } => "optimize-image",
            Size { .. } => "size",
            Dest { .. } => "dest",
            Notify { .. } => "notify",
        })
        .collect()
}
