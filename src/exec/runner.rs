// src/exec/runner.rs

//! Individual task process runner.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskwatchError};

/// Run `cmd` through the platform shell on behalf of `task` and wait for it.
///
/// Stdout lines are logged at info, stderr lines at warn. A non-zero exit is
/// reported as [`TaskwatchError::TaskFailed`].
pub async fn run_command(task: &str, cmd: &str) -> Result<()> {
    info!(task = %task, cmd = %cmd, "starting task process");
    let started = Instant::now();

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(forward_lines(task.to_string(), out, false)));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(forward_lines(task.to_string(), err, true)));

    let status = child.wait().await?;

    // Drain the output readers so log lines precede the exit record.
    for reader in [stdout, stderr].into_iter().flatten() {
        let _ = reader.await;
    }

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task,
        exit_code = code,
        success = status.success(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "task process exited"
    );

    if status.success() {
        Ok(())
    } else {
        Err(TaskwatchError::TaskFailed {
            task: task.to_string(),
            code,
        })
    }
}

async fn forward_lines<R>(task: String, stream: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => warn!(task = %task, "stderr: {}", line),
            Ok(Some(line)) => info!(task = %task, "stdout: {}", line),
            Ok(None) => break,
            Err(err) => {
                debug!(task = %task, error = %err, "stopped reading task output");
                break;
            }
        }
    }
}
