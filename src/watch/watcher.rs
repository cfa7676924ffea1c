// src/watch/watcher.rs

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::livereload::LiveReloadHub;
use crate::watch::event_handler::{WatchDecision, WatchEventHandler};

/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `handler.root()` recursively.
///
/// Events are coalesced until `debounce` passes without a new one; each
/// batch then yields at most one `TaskTriggered { reason: FileWatch }` and
/// one live-reload push per changed output file.
pub fn spawn_watcher(
    mut handler: WatchEventHandler,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    hub: Option<LiveReloadHub>,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let root = handler.root().to_path_buf();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Receiver gone means the watch loop already stopped.
                let _ = event_tx.send(event);
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = %root.display(), debounce_ms = debounce.as_millis() as u64, "file watcher started");

    tokio::spawn(async move {
        handler = match tokio::task::spawn_blocking(move || {
            handler.prime_hashes();
            handler
        })
        .await
        {
            Ok(handler) => handler,
            Err(err) => {
                warn!(error = %err, "priming watch hashes failed; watcher stopped");
                return;
            }
        };

        while let Some(first) = event_rx.recv().await {
            let mut paths = Vec::new();
            collect_paths(&mut paths, first);

            while let Ok(Some(event)) = timeout(debounce, event_rx.recv()).await {
                collect_paths(&mut paths, event);
            }
            if paths.is_empty() {
                continue;
            }
            debug!(paths = paths.len(), "debounced change batch");

            let joined = tokio::task::spawn_blocking(move || {
                let decision = handler.process_batch(&paths);
                (handler, decision)
            })
            .await;
            let decision: WatchDecision;
            (handler, decision) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "watch batch processing failed; watcher stopped");
                    return;
                }
            };

            if let Some(hub) = &hub {
                for path in &decision.reloads {
                    hub.reload(path.clone());
                }
            }

            if !decision.tasks.is_empty() {
                let event = RuntimeEvent::TaskTriggered {
                    tasks: decision.tasks,
                    reason: TriggerReason::FileWatch,
                };
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime gone; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Keep paths of content-changing events, deduplicated in arrival order.
fn collect_paths(into: &mut Vec<PathBuf>, event: Event) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    for path in event.paths {
        if !into.contains(&path) {
            into.push(path);
        }
    }
}
