// src/exec/command.rs

//! External commands used by `lint` and `exec` stages.

use std::process::{Output, Stdio};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmdline: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmdline);
        c
    };
    cmd.kill_on_drop(true);
    cmd
}

/// Run `cmdline` through the shell with `input` on stdin and collect
/// stdout/stderr.
///
/// stdin is fed from a separate tokio task so a command that writes a lot
/// before reading all of its input cannot deadlock against us.
pub async fn run_with_stdin(cmdline: &str, input: Vec<u8>) -> Result<Output> {
    debug!(cmd = %cmdline, bytes = input.len(), "running external command");

    let mut child = shell_command(cmdline)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning `{cmdline}`"))?;

    if let Some(mut stdin) = child.stdin.take() {
        let cmdline = cmdline.to_string();
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(&input).await {
                // Commands that ignore stdin close it early; that is fine.
                debug!(cmd = %cmdline, error = %err, "stdin closed before all input was written");
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{cmdline}`"))?;

    if !output.status.success() {
        warn!(
            cmd = %cmdline,
            exit_code = output.status.code().unwrap_or(-1),
            "external command exited with failure"
        );
    }

    Ok(output)
}
