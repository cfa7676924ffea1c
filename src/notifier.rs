// src/notifier.rs

//! Desktop notifications.
//!
//! Sent by `notify` pipeline stages and by the runtime when a run fails.
//! Delivery is best effort: a missing `notify-send` never fails a build.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info, warn};

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

pub trait Notifier: Send + Sync + fmt::Debug {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a>;
}

/// Spawns the platform's notification tool.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn command(title: &str, message: &str) -> Command {
        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification {} with title {}",
                applescript_string(message),
                applescript_string(title)
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            cmd
        } else {
            let mut cmd = Command::new("notify-send");
            cmd.arg("--app-name=taskpipe").arg(title).arg(message);
            cmd
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            let mut cmd = Self::command(title, message);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());

            match cmd.status().await {
                Ok(status) if status.success() => {
                    debug!(%title, %message, "desktop notification sent");
                }
                Ok(status) => {
                    warn!(%title, exit_code = status.code().unwrap_or(-1), "notification command failed");
                }
                Err(err) => {
                    warn!(%title, %message, error = %err, "could not send desktop notification");
                }
            }
        })
    }
}

/// Only writes notifications to the log (`[config] notifications = false`).
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            info!(%title, %message, "notification");
        })
    }
}

/// Pick the notifier for the `notifications` config flag.
pub fn notifier_for(enabled: bool) -> Arc<dyn Notifier> {
    if enabled {
        Arc::new(DesktopNotifier)
    } else {
        Arc::new(LogNotifier)
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
