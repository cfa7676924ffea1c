// src/watch/event_handler.rs

//! Turning a debounced batch of changed paths into one trigger.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::engine::queue::merge_unique;
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::dag_filter::keep_most_dependent;
use crate::watch::hash::{MemoryHashStore, compute_aggregate_hash};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{BindingProfile, collect_matching_files};

/// What a batch of changes asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchDecision {
    /// Tasks to run together as one batch.
    pub tasks: Vec<TaskName>,
    /// Changed output files (relative paths) for the live-reload hub.
    pub reloads: Vec<String>,
}

impl WatchDecision {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.reloads.is_empty()
    }
}

/// Stateful, synchronous part of the watcher.
///
/// Per batch:
/// 1. paths matching the live-reload set go to `reloads` and nothing else;
/// 2. every binding matching a remaining path contributes its task;
/// 3. `use_hash` bindings whose watched files hash the same as last time
///    are dropped;
/// 4. tasks another matched task depends on are dropped.
pub struct WatchEventHandler {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    profiles: Vec<BindingProfile>,
    graph: DagGraph,
    reload_set: Option<GlobSet>,
    hashes: MemoryHashStore,
    cache: FileCache,
}

impl std::fmt::Debug for WatchEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEventHandler")
            .field("root", &self.root)
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}

impl WatchEventHandler {
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        profiles: Vec<BindingProfile>,
        graph: DagGraph,
    ) -> Self {
        Self {
            root: root.into(),
            fs,
            profiles,
            graph,
            reload_set: None,
            hashes: MemoryHashStore::new(),
            cache: FileCache::new(),
        }
    }

    /// Paths matching `reload_set` are live-reload outputs, not sources.
    pub fn with_reload_set(mut self, reload_set: GlobSet) -> Self {
        self.reload_set = Some(reload_set);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record the current hash of every `use_hash` binding, so the first
    /// change that does not alter contents does not trigger.
    pub fn prime_hashes(&mut self) {
        for index in 0..self.profiles.len() {
            if self.profiles[index].use_hash() {
                let _ = self.hash_changed(index);
            }
        }
    }

    pub fn process_batch(&mut self, paths: &[PathBuf]) -> WatchDecision {
        let mut decision = WatchDecision::default();
        let mut sources: Vec<String> = Vec::new();

        for path in paths {
            let Some(rel) = relative_str(&self.root, path) else {
                warn!(path = %path.display(), root = %self.root.display(), "change outside project root");
                continue;
            };
            if rel.is_empty() {
                continue;
            }
            self.cache.forget(path);

            if self.reload_set.as_ref().is_some_and(|set| set.is_match(&rel)) {
                merge_unique(&mut decision.reloads, std::slice::from_ref(&rel));
            } else {
                merge_unique(&mut sources, std::slice::from_ref(&rel));
            }
        }

        let mut matched: Vec<TaskName> = Vec::new();
        for index in 0..self.profiles.len() {
            let profile = &self.profiles[index];
            if !sources.iter().any(|rel| profile.matches(rel)) {
                continue;
            }
            let task = profile.task().to_string();
            if profile.use_hash() && !self.hash_changed(index) {
                info!(task = %task, "watched files unchanged (hash match); skipping");
                continue;
            }
            merge_unique(&mut matched, std::slice::from_ref(&task));
        }

        decision.tasks = keep_most_dependent(&matched, &self.graph);
        if matched.len() != decision.tasks.len() {
            debug!(?matched, kept = ?decision.tasks, "dropped tasks covered by a dependent");
        }
        if !decision.is_empty() {
            info!(changed = sources.len(), tasks = ?decision.tasks, reloads = decision.reloads.len(), "watch batch");
        }

        decision
    }

    /// Rehash the files of binding `index`; `true` if the aggregate differs
    /// from the stored one (or could not be computed).
    fn hash_changed(&mut self, index: usize) -> bool {
        let profile = &self.profiles[index];
        let key = format!("{}#{index}", profile.task());

        let files = match collect_matching_files(self.fs.as_ref(), &self.root, profile) {
            Ok(files) => files,
            Err(err) => {
                warn!(task = profile.task(), error = %err, "cannot list watched files; assuming changed");
                return true;
            }
        };

        let mut hashes = Vec::with_capacity(files.len());
        for file in &files {
            match self.cache.hash_of(self.fs.as_ref(), file) {
                Ok(hash) => hashes.push(hash),
                Err(err) => {
                    warn!(path = %file.display(), error = %err, "cannot hash file; assuming changed");
                    return true;
                }
            }
        }

        let hash = compute_aggregate_hash(&hashes);
        let changed = self.hashes.load(&key) != Some(hash.as_str());
        if changed {
            self.hashes.save(&key, &hash);
        }
        changed
    }
}
