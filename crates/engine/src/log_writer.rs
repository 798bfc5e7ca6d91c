// SPDX-License-Identifier: MIT

//! Per-task append-only log file writer (spec §4.2). One writer exists per
//! running task; grounded on `internal/task_logger/task_logger.go` in
//! `original_source/` (create dir 0755, create `<id>.log`, buffered writes,
//! append newline if missing, drain-then-close).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 1000;
const BUFFER_CAPACITY: usize = 4096;
const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize log file: {0}")]
pub struct LogInitError(pub String);

pub fn log_file_path(dir: &Path, task_id: i64) -> PathBuf {
    dir.join(format!("{task_id}.log"))
}

/// Buffered, flush-on-a-timer writer for one task's log file. Writes are
/// enqueued onto a bounded channel so producers (the executor's select
/// loop) never block on disk I/O; `close()` must be called exactly once.
pub struct LogWriter {
    tx: mpsc::Sender<Vec<u8>>,
    flush_task: JoinHandle<()>,
}

impl LogWriter {
    /// Ensure `dir` exists (mode 0755) and create `<task_id>.log` for
    /// writing, then start the buffered-flush background task.
    pub async fn create(dir: &Path, task_id: i64) -> Result<Self, LogInitError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| LogInitError(format!("creating log directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).await;
        }

        let path = log_file_path(dir, task_id);
        let file = std::fs::File::create(&path)
            .map_err(|e| LogInitError(format!("creating log file {}: {e}", path.display())))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let flush_task = tokio::spawn(run_flush_loop(file, rx));

        Ok(Self { tx, flush_task })
    }

    /// Enqueue a line, appending a trailing newline if the caller didn't
    /// include one. Never blocks longer than the channel's own backpressure.
    pub async fn write_line(&self, mut line: String) {
        if !line.ends_with('\n') {
            line.push('\n');
        }
        if self.tx.send(line.into_bytes()).await.is_err() {
            warn!("log writer channel closed; dropping line");
        }
    }

    /// Drain the channel, flush the buffer, and close the file. Must be
    /// called exactly once per task; subsequent writes after this returns
    /// are not visible.
    pub async fn close(self) {
        drop(self.tx);
        let _ = self.flush_task.await;
    }
}

async fn run_flush_loop(file: std::fs::File, mut rx: mpsc::Receiver<Vec<u8>>) {
    let mut writer = std::io::BufWriter::with_capacity(BUFFER_CAPACITY, file);
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            maybe_line = rx.recv() => {
                match maybe_line {
                    Some(bytes) => {
                        if let Err(e) = writer.write_all(&bytes) {
                            warn!(error = %e, "failed to buffer log line");
                        }
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = writer.flush() {
                    warn!(error = %e, "failed to flush log buffer");
                }
            }
        }
    }

    // Drain whatever is still queued, then flush once more before closing.
    while let Ok(bytes) = rx.try_recv() {
        let _ = writer.write_all(&bytes);
    }
    let _ = writer.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_are_visible_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::create(dir.path(), 1).await.unwrap();
        writer.write_line("hello".to_string()).await;
        writer.write_line("world".to_string()).await;
        writer.close().await;

        let contents = std::fs::read_to_string(log_file_path(dir.path(), 1)).unwrap();
        assert_eq!(contents, "hello\nworld\n");
    }

    #[tokio::test]
    async fn appends_newline_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::create(dir.path(), 2).await.unwrap();
        writer.write_line("no newline".to_string()).await;
        writer.close().await;

        let contents = std::fs::read_to_string(log_file_path(dir.path(), 2)).unwrap();
        assert_eq!(contents, "no newline\n");
    }
}
