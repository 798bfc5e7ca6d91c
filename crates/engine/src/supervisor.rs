// SPDX-License-Identifier: MIT

//! Spawns a task's shell command as a child process, fans its stdout/stderr
//! out as line streams, and supports idempotent cancellation (spec §4.1).

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const LINE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
#[error("failed to spawn process: {0}")]
pub struct SpawnError(pub String);

/// The two line-oriented streams produced by a running child's pipes.
pub struct SupervisorStreams {
    pub stdout: mpsc::Receiver<String>,
    pub stderr: mpsc::Receiver<String>,
}

/// Thin wrapper around a child process running `bash -c <command>` in its
/// own process group, so a SIGTERM/SIGINT to the server does not cascade
/// into whatever the task is running.
pub struct Supervisor {
    child: Option<Child>,
    cancelled: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            child: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn `bash -c command`. Fails with `SpawnError` if pipe creation or
    /// process start fails; on success, two reader tasks start immediately
    /// and run until EOF or a pipe read error (one pipe erroring does not
    /// abort the other).
    pub fn start(&mut self, command: &str) -> Result<SupervisorStreams, SpawnError> {
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // New process group so cancelling this task never signals the server.
        // SAFETY: setsid() is async-signal-safe and runs before exec in the child.
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|e| SpawnError(e.to_string()))?;

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| SpawnError("stdout pipe not created".into()))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| SpawnError("stderr pipe not created".into()))?;

        let (stdout_tx, stdout_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);

        spawn_line_reader(stdout_pipe, stdout_tx, "stdout");
        spawn_line_reader(stderr_pipe, stderr_tx, "stderr");

        self.child = Some(child);
        Ok(SupervisorStreams {
            stdout: stdout_rx,
            stderr: stderr_rx,
        })
    }

    /// Kill the process group. Idempotent: a second call is a no-op. Races
    /// with natural completion — whichever happens first wins.
    pub fn cancel(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(child) = &self.child {
            if let Some(pid) = child.id() {
                #[cfg(unix)]
                // SAFETY: kill() is async-signal-safe; negative pid targets the group.
                unsafe {
                    libc::kill(-(pid as i32), libc::SIGKILL);
                }
            }
        }
    }

    /// Block until the child reaps, returning its exit code or `-1` when it
    /// did not exit normally (killed by signal, or reaping failed).
    pub async fn wait(&mut self) -> i32 {
        let Some(child) = self.child.as_mut() else {
            return -1;
        };
        match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                warn!(error = %e, "failed to reap child process");
                -1
            }
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_line_reader<R>(pipe: R, tx: mpsc::Sender<String>, name: &'static str)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(pipe = name, error = %e, "pipe read error");
                    break;
                }
            }
        }
        debug!(pipe = name, "pipe closed");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_stderr_lines() {
        let mut sup = Supervisor::new();
        let mut streams = sup
            .start("echo a; echo b >&2; exit 3")
            .expect("spawn should succeed");

        let mut out = Vec::new();
        let mut err = Vec::new();
        loop {
            tokio::select! {
                Some(l) = streams.stdout.recv() => out.push(l),
                Some(l) = streams.stderr.recv() => err.push(l),
                else => break,
            }
        }

        assert_eq!(out, vec!["a".to_string()]);
        assert_eq!(err, vec!["b".to_string()]);
        assert_eq!(sup.wait().await, 3);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_kills_long_running_process() {
        let mut sup = Supervisor::new();
        let _streams = sup.start("sleep 30").expect("spawn should succeed");
        sup.cancel();
        sup.cancel();
        let code = sup.wait().await;
        assert_ne!(code, 0);
    }
}
