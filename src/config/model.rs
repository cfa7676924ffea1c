// src/config/model.rs

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::types::OverlapPolicy;

/// Top-level configuration as read from a `Taskpipe.toml` file.
///
/// ```toml
/// [config]
/// on_overlap = "queue"
///
/// [defaults]
/// exclude = [".git/**"]
///
/// [task.sass]
/// src = ["app/scss/*.scss"]
/// stages = [
///   { kind = "exec", cmd = "sass --stdin", extension = "css" },
///   { kind = "dest", dir = "dist/css" },
/// ]
///
/// [task.styles]
/// after = ["sass", "old-ie"]
///
/// [[watch]]
/// paths = ["app/scss/**/*.scss"]
/// task = "styles"
/// ```
///
/// This is the unvalidated shape; use `ConfigFile::try_from` (or
/// [`load_and_validate`](crate::config::load_and_validate)) to get a
/// [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub defaults: DefaultSection,

    #[serde(default)]
    pub livereload: LiveReloadSection,

    /// All tasks from `[task.<name>]`, keyed by task name, in the order
    /// they appear in the file.
    #[serde(default)]
    pub task: IndexMap<String, TaskConfig>,

    /// Watch bindings from `[[watch]]`.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// A validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>`, so holding one means
/// every `after`/`then`/watch reference resolves and the task graph is
/// acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    defaults: DefaultSection,
    livereload: LiveReloadSection,
    task: IndexMap<String, TaskConfig>,
    watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            defaults: raw.defaults,
            livereload: raw.livereload,
            task: raw.task,
            watch: raw.watch,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn defaults(&self) -> &DefaultSection {
        &self.defaults
    }

    pub fn livereload(&self) -> &LiveReloadSection {
        &self.livereload
    }

    /// Tasks in declaration order.
    pub fn tasks(&self) -> &IndexMap<String, TaskConfig> {
        &self.task
    }

    pub fn watch_bindings(&self) -> &[WatchConfig] {
        &self.watch
    }
}

/// `[config]` section: global runtime behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"replace"`. See [`OverlapPolicy`].
    #[serde(default)]
    pub on_overlap: OverlapPolicy,

    /// Maximum number of queued trigger batches to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Quiet period used to coalesce bursts of filesystem events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Send desktop notifications (`notify` stages, failed runs).
    #[serde(default = "default_true")]
    pub notifications: bool,
}

fn default_queue_length() -> usize {
    1
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            on_overlap: OverlapPolicy::default(),
            queue_length: default_queue_length(),
            debounce_ms: default_debounce_ms(),
            notifications: true,
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Exclude patterns appended to every watch binding.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[livereload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReloadSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_livereload_host")]
    pub host: String,

    #[serde(default = "default_livereload_port")]
    pub port: u16,

    /// Output paths whose changes are pushed to browsers.
    #[serde(default = "default_livereload_watch")]
    pub watch: Vec<String>,
}

fn default_livereload_host() -> String {
    "127.0.0.1".to_string()
}

fn default_livereload_port() -> u16 {
    35729
}

fn default_livereload_watch() -> Vec<String> {
    vec!["dist/**".to_string()]
}

impl Default for LiveReloadSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_livereload_host(),
            port: default_livereload_port(),
            watch: default_livereload_watch(),
        }
    }
}

/// `[task.<name>]` section.
///
/// The kind of action is inferred from the keys present:
/// - `clean = [...]` -> remove those paths;
/// - `src = [...]` (+ `stages`) -> file pipeline;
/// - neither -> a group task that only aggregates `after`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Tasks that must complete before this one (`after = ["sass", "old-ie"]`).
    #[serde(default)]
    pub after: Vec<String>,

    /// Tasks started as a new run once a run in which this task succeeded
    /// has finished.
    #[serde(default)]
    pub then: Vec<String>,

    /// Source globs, relative to the project root.
    #[serde(default)]
    pub src: Vec<String>,

    /// Globs removed from the `src` match.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Ordered stage chain applied to the matched files.
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// Paths to delete, relative to the project root.
    #[serde(default)]
    pub clean: Vec<String>,
}

/// One entry of a task's `stages = [...]` list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StageConfig {
    /// External linter; non-zero exit halts the pipeline.
    Lint { cmd: String },

    /// Pipe each file through an external command (stdin -> stdout).
    Exec {
        cmd: String,
        #[serde(default)]
        extension: Option<String>,
        /// Keep an attached source map (line-level, against the original
        /// sources) on the command's output.
        #[serde(default = "default_true")]
        keep_source_map: bool,
    },

    /// Vendor prefixes for the given browser targets (`{ chrome = "100" }`).
    Autoprefix {
        #[serde(default)]
        browsers: BTreeMap<String, String>,
    },

    MinifyCss,

    /// rem -> px fallback.
    Pxrem {
        #[serde(default = "default_root_value")]
        root_value: String,
        #[serde(default = "default_true")]
        replace: bool,
    },

    Rename {
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
        #[serde(default)]
        basename: Option<String>,
        #[serde(default)]
        extname: Option<String>,
    },

    /// Join every file into one.
    Concat {
        file: String,
        #[serde(default)]
        source_map: bool,
    },

    /// Write attached source maps as side files.
    SourceMaps {
        #[serde(default = "default_map_dir")]
        dir: String,
    },

    OptimizeImage {
        #[serde(default = "default_jpeg_quality")]
        jpeg_quality: u8,
    },

    Size {
        #[serde(default)]
        title: Option<String>,
    },

    /// Write the current files under `dir` (relative to the project root).
    Dest { dir: String },

    /// Desktop notification once per invocation.
    Notify { message: String },
}

fn default_root_value() -> String {
    "100%".to_string()
}

fn default_map_dir() -> String {
    ".".to_string()
}

fn default_jpeg_quality() -> u8 {
    80
}

/// `[[watch]]` entry: re-run `task` when any of `paths` changes.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub paths: Vec<String>,

    pub task: String,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Only trigger when the watched files' contents actually changed.
    #[serde(default)]
    pub use_hash: bool,
}
