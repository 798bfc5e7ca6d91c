// SPDX-License-Identifier: MIT

//! Per-task orchestration from dispatch to terminal state (spec §4.4).
//! Parses the command, optionally validates it, initializes the log file,
//! starts the Supervisor, and fans stdout/stderr out to the Log Writer and
//! Event Hub until EOF or cancellation.

use std::path::PathBuf;
use std::sync::Arc;

use ote_core::{LogEvent, Task, TaskStatus};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::event_hub::EventHub;
use crate::job::JobHandle;
use crate::log_writer::LogWriter;
use crate::supervisor::Supervisor;

/// A terminal or Running status change, sent back to the Task Manager's
/// single listener for serialized persistence plus Event Hub publication.
/// The Executor never touches the store or the registry directly.
#[derive(Debug)]
pub enum TaskUpdate {
    Running { task_id: i64 },
    Completed { task_id: i64, exit_code: i32 },
    Failed { task_id: i64, reason: String, exit_code: i32 },
    Cancelled { task_id: i64, reason: String, exit_code: i32 },
}

impl TaskUpdate {
    pub fn task_id(&self) -> i64 {
        match self {
            TaskUpdate::Running { task_id }
            | TaskUpdate::Completed { task_id, .. }
            | TaskUpdate::Failed { task_id, .. }
            | TaskUpdate::Cancelled { task_id, .. } => *task_id,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            TaskUpdate::Running { .. } => TaskStatus::Running,
            TaskUpdate::Completed { .. } => TaskStatus::Completed,
            TaskUpdate::Failed { .. } => TaskStatus::Failed,
            TaskUpdate::Cancelled { .. } => TaskStatus::Cancelled,
        }
    }
}

/// Run one task to completion. `updates` carries status transitions back to
/// the Manager; log lines and the Running/terminal events themselves are
/// published directly to `hub` by this function, matching spec §4.4 (the
/// Manager republishes status events to the hub once it has persisted
/// them — see `manager::dispatch_update` — so this function does not
/// publish status events itself, only log events).
pub async fn run(
    task: Task,
    log_dir: PathBuf,
    validate: bool,
    hub: Arc<EventHub>,
    updates: mpsc::Sender<TaskUpdate>,
    mut job: JobHandle,
) {
    let task_id = task.id;

    if let Err(e) = ote_shell::parse_command(&task.command) {
        let _ = updates
            .send(TaskUpdate::Failed {
                task_id,
                reason: e.to_string(),
                exit_code: 1,
            })
            .await;
        return;
    }

    if validate {
        let findings = ote_shell::validate_command(&task.command);
        if let Some(finding) = findings
            .into_iter()
            .find(|f| f.severity == ote_shell::Severity::Error)
        {
            let _ = updates
                .send(TaskUpdate::Failed {
                    task_id,
                    reason: format!("malicious command: {}", finding.message),
                    exit_code: 1,
                })
                .await;
            return;
        }
    }

    let log_writer = match LogWriter::create(&log_dir, task_id).await {
        Ok(w) => w,
        Err(e) => {
            let _ = updates
                .send(TaskUpdate::Failed {
                    task_id,
                    reason: e.to_string(),
                    exit_code: 1,
                })
                .await;
            return;
        }
    };

    let mut supervisor = Supervisor::new();
    let mut streams = match supervisor.start(&task.command) {
        Ok(s) => s,
        Err(e) => {
            log_writer.close().await;
            let _ = updates
                .send(TaskUpdate::Failed {
                    task_id,
                    reason: e.to_string(),
                    exit_code: 1,
                })
                .await;
            return;
        }
    };

    // The Manager republishes this to the hub once it has persisted it (see
    // `manager::apply_update`), same as every other `TaskUpdate` — publishing
    // it here too would double the Running event.
    if updates
        .send(TaskUpdate::Running { task_id })
        .await
        .is_err()
    {
        supervisor.cancel();
        log_writer.close().await;
        return;
    }

    let mut line_number: u64 = 0;
    let mut stderr_reason = String::new();
    let mut stdout_done = false;
    let mut stderr_done = false;
    let mut cancelled = false;

    loop {
        if stdout_done && stderr_done {
            break;
        }
        tokio::select! {
            biased;
            changed = job.cancel_rx.changed(), if !cancelled => {
                if changed.is_ok() && *job.cancel_rx.borrow() {
                    cancelled = true;
                    break;
                }
            }
            line = streams.stdout.recv(), if !stdout_done => {
                match line {
                    Some(l) => {
                        line_number += 1;
                        log_writer.write_line(l.clone()).await;
                        hub.publish_log(LogEvent { task_id, line_number, line: l });
                    }
                    None => stdout_done = true,
                }
            }
            line = streams.stderr.recv(), if !stderr_done => {
                match line {
                    Some(l) => {
                        line_number += 1;
                        stderr_reason.push_str(&l);
                        stderr_reason.push('\n');
                        log_writer.write_line(l.clone()).await;
                        hub.publish_log(LogEvent { task_id, line_number, line: l });
                    }
                    None => stderr_done = true,
                }
            }
        }
    }

    let update = if cancelled {
        supervisor.cancel();
        let exit_code = supervisor.wait().await;
        info!(task_id, "task cancelled");
        TaskUpdate::Cancelled {
            task_id,
            reason: "cancelled by system".to_string(),
            exit_code,
        }
    } else {
        let exit_code = supervisor.wait().await;
        if exit_code == 0 {
            TaskUpdate::Completed { task_id, exit_code }
        } else {
            TaskUpdate::Failed {
                task_id,
                reason: stderr_reason.trim_end().to_string(),
                exit_code,
            }
        }
    };

    log_writer.close().await;

    if updates.send(update).await.is_err() {
        warn!(task_id, "task-update channel closed before terminal event was delivered");
    }
}
