use taskpipe::config::{
    ConfigFile, RawConfigFile, StageConfig, TaskConfig, WatchConfig,
};
use taskpipe::engine::OverlapPolicy;
use taskpipe::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, task: &str, paths: &[&str]) -> Self {
        self.config.watch.push(WatchConfig {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            task: task.to_string(),
            exclude: Vec::new(),
            use_hash: false,
        });
        self
    }

    pub fn with_default_exclude(mut self, pattern: &str) -> Self {
        self.config.defaults.exclude.push(pattern.to_string());
        self
    }

    pub fn with_overlap(mut self, policy: OverlapPolicy, queue_length: usize) -> Self {
        self.config.config.on_overlap = policy;
        self.config.config.queue_length = queue_length;
        self
    }

    pub fn without_livereload(mut self) -> Self {
        self.config.livereload.enabled = false;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Builder for `TaskConfig`.
#[derive(Debug, Default)]
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task with no action of its own.
    pub fn group() -> Self {
        Self::default()
    }

    /// A pipeline task over `src`.
    pub fn pipeline(src: &[&str]) -> Self {
        let mut builder = Self::default();
        builder.task.src = src.iter().map(|s| s.to_string()).collect();
        builder
    }

    /// A `clean` task.
    pub fn clean(paths: &[&str]) -> Self {
        let mut builder = Self::default();
        builder.task.clean = paths.iter().map(|s| s.to_string()).collect();
        builder
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn then(mut self, next: &str) -> Self {
        self.task.then.push(next.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.task.stages.push(stage);
        self
    }

    pub fn dest(self, dir: &str) -> Self {
        self.stage(StageConfig::Dest {
            dir: dir.to_string(),
        })
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
