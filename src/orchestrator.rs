// src/orchestrator.rs

//! Public facade: register tasks, run them, watch for changes.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use taskpipe::orchestrator::Orchestrator;
//! # use taskpipe::registry::{GroupAction, TaskRegistry};
//! # async fn demo() -> taskpipe::errors::Result<()> {
//! let mut registry = TaskRegistry::new();
//! registry.register("sass", Vec::<String>::new(), Arc::new(GroupAction))?;
//! registry.register("old-ie", Vec::<String>::new(), Arc::new(GroupAction))?;
//! registry.register("styles", ["sass", "old-ie"], Arc::new(GroupAction))?;
//!
//! let report = Orchestrator::new(registry).run("styles").await?;
//! assert_eq!(report.succeeded.last().map(String::as_str), Some("styles"));
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::dag::{DagGraph, ExecutionPlan, RunReport, Scheduler};
use crate::engine::{
    CoreRuntime, OverlapPolicy, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
use crate::errors::{Result, TaskpipeError};
use crate::exec::ActionExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::livereload::{LiveReloadHub, spawn_server};
use crate::notifier::Notifier;
use crate::registry::TaskRegistry;
use crate::watch::{
    WatchBinding, WatchEventHandler, build_globset, compile_bindings, spawn_watcher,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything `watch` needs besides the bindings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Tasks run once before the first change is handled.
    pub initial: Vec<TaskName>,
    pub debounce: Duration,
    /// Output globs forwarded to live-reload clients instead of triggering.
    pub reload_patterns: Vec<String>,
    /// Address of the live-reload server; `None` disables it.
    pub livereload: Option<SocketAddr>,
    /// Filesystem used for `use_hash` bindings.
    pub fs: Arc<dyn FileSystem>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            initial: Vec::new(),
            debounce: Duration::from_millis(100),
            reload_patterns: Vec::new(),
            livereload: None,
            fs: Arc::new(RealFileSystem),
        }
    }
}

impl WatchOptions {
    /// Options from `[config]` and `[livereload]`.
    pub fn from_config(cfg: &ConfigFile, initial: Vec<TaskName>) -> Result<Self> {
        let lr = cfg.livereload();
        let (reload_patterns, livereload) = if lr.enabled {
            let addr = format!("{}:{}", lr.host, lr.port)
                .parse::<SocketAddr>()
                .map_err(|e| {
                    TaskpipeError::ConfigError(format!(
                        "invalid [livereload] address {}:{}: {e}",
                        lr.host, lr.port
                    ))
                })?;
            (lr.watch.clone(), Some(addr))
        } else {
            (Vec::new(), None)
        };

        Ok(Self {
            initial,
            debounce: Duration::from_millis(cfg.config().debounce_ms),
            reload_patterns,
            livereload,
            fs: Arc::new(RealFileSystem),
        })
    }
}

/// Runs tasks from an immutable [`TaskRegistry`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    policy: OverlapPolicy,
    queue_length: usize,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Orchestrator {
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            policy: OverlapPolicy::default(),
            queue_length: 1,
            notifier: None,
        }
    }

    /// What to do with triggers that arrive while a run is active.
    pub fn with_overlap(mut self, policy: OverlapPolicy, queue_length: usize) -> Self {
        self.policy = policy;
        self.queue_length = queue_length.max(1);
        self
    }

    /// Notify on failed runs.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Resolve the execution plan for `targets` without running anything.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<ExecutionPlan> {
        let graph = DagGraph::from_registry(&self.registry);
        ExecutionPlan::resolve(&graph, targets)
    }

    /// Run `name` and its dependencies once.
    ///
    /// Returns the report of that run. If it or one of the follow-up runs it
    /// started failed, the first failure is returned as
    /// [`TaskpipeError::Stage`].
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        let mut reports = self.run_reports(&[name]).await?.into_iter();

        let Some(first) = reports.next() else {
            return Err(TaskpipeError::ConfigError(format!(
                "run of '{name}' finished without a report"
            )));
        };
        if let Some(err) = first.first_failure() {
            return Err(err);
        }
        if let Some(err) = reports.find_map(|r| r.first_failure()) {
            return Err(err);
        }
        Ok(first)
    }

    /// Run `targets` as one batch, then any follow-ups, and return every
    /// run's report in order. Failed runs are reported, not returned as
    /// errors; only planning errors are.
    pub async fn run_reports<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<RunReport>> {
        let plan = self.plan(targets)?;
        let targets: Vec<TaskName> = plan.targets().to_vec();

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
        let runtime = self.runtime(tx.clone(), rx, true);

        tx.send(RuntimeEvent::TaskTriggered {
            tasks: targets,
            reason: TriggerReason::Manual,
        })
        .await
        .map_err(crate::errors::Error::from)?;

        runtime.run().await
    }

    /// Watch `root` until Ctrl-C or SIGTERM, re-running bound tasks on
    /// changes. Returns every run's report.
    pub async fn watch(
        &self,
        root: impl AsRef<Path>,
        bindings: Vec<WatchBinding>,
        options: WatchOptions,
    ) -> Result<Vec<RunReport>> {
        self.watch_until(root, bindings, options, shutdown_signal())
            .await
    }

    /// Like [`watch`](Self::watch) but stops when `shutdown` completes.
    pub async fn watch_until<F>(
        &self,
        root: impl AsRef<Path>,
        bindings: Vec<WatchBinding>,
        options: WatchOptions,
        shutdown: F,
    ) -> Result<Vec<RunReport>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let root: PathBuf = root.as_ref().to_path_buf();
        let root = root.canonicalize().unwrap_or(root);

        // Surface unknown tasks and cycles before anything starts.
        if !options.initial.is_empty() {
            self.plan(&options.initial)?;
        }
        for binding in &bindings {
            self.plan(std::slice::from_ref(&binding.task))?;
        }

        let profiles = compile_bindings(&bindings)?;
        let graph = DagGraph::from_registry(&self.registry);
        let mut handler = WatchEventHandler::new(&root, Arc::clone(&options.fs), profiles, graph);
        if !options.reload_patterns.is_empty() {
            handler = handler.with_reload_set(build_globset(&options.reload_patterns)?);
        }

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);

        let mut server = None;
        let hub = match options.livereload {
            Some(addr) => {
                let hub = LiveReloadHub::default();
                let (_, handle) = spawn_server(hub.clone(), addr).await?;
                server = Some(handle);
                Some(hub)
            }
            None => None,
        };

        let _watcher = spawn_watcher(handler, tx.clone(), hub, options.debounce)?;

        {
            let tx = tx.clone();
            tokio::spawn(async move {
                shutdown.await;
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        info!(root = %root.display(), bindings = bindings.len(), "watching for changes");

        let runtime = self.runtime(tx.clone(), rx, false);
        if !options.initial.is_empty() {
            tx.send(RuntimeEvent::TaskTriggered {
                tasks: options.initial.clone(),
                reason: TriggerReason::Manual,
            })
            .await
            .map_err(crate::errors::Error::from)?;
        }

        let reports = runtime.run().await;

        if let Some(server) = server {
            server.abort();
            debug!("live reload server stopped");
        }
        reports
    }

    fn runtime(
        &self,
        tx: mpsc::Sender<RuntimeEvent>,
        rx: mpsc::Receiver<RuntimeEvent>,
        exit_when_idle: bool,
    ) -> Runtime<ActionExecutorBackend> {
        let scheduler = Scheduler::from_registry(&self.registry);
        let core = CoreRuntime::new(
            scheduler,
            self.policy,
            self.queue_length,
            RuntimeOptions { exit_when_idle },
        );
        let runtime = Runtime::new(core, rx, ActionExecutorBackend::new(tx));
        match &self.notifier {
            Some(notifier) => runtime.with_notifier(Arc::clone(notifier)),
            None => runtime,
        }
    }
}

/// Completes on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
