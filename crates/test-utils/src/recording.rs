use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskpipe::errors::StageError;
use taskpipe::notifier::{Notifier, NotifyFuture};
use taskpipe::registry::{ActionContext, ActionFuture, ActionReport, TaskAction};

/// Shared, ordered log of action invocations.
pub type InvocationLog = Arc<Mutex<Vec<String>>>;

pub fn invocation_log() -> InvocationLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Task action that appends its task name to a shared log.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    log: InvocationLog,
    delay: Option<Duration>,
    failure: Option<StageError>,
}

impl RecordingAction {
    pub fn new(log: &InvocationLog) -> Self {
        Self {
            log: Arc::clone(log),
            delay: None,
            failure: None,
        }
    }

    /// Sleep before finishing, so tests can overlap triggers with a run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, err: StageError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn arc(self) -> Arc<dyn TaskAction> {
        Arc::new(self)
    }
}

impl TaskAction for RecordingAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(ctx.task.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(ActionReport::default()),
            }
        })
    }
}

/// Notifier that keeps every `(title, message)` it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
        })
    }
}
