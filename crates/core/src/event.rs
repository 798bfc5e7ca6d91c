// SPDX-License-Identifier: MIT

use crate::task::TaskStatus;
use serde::{Deserialize, Serialize};

/// One output line published by the Job Executor, in producer order. Line
/// numbers are 1-based and gap-free within a task, regardless of which pipe
/// (stdout/stderr) produced the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub task_id: i64,
    pub line_number: u64,
    pub line: String,
}

/// A status transition, published exactly once per terminal state and once
/// for the Running transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub task_id: i64,
    pub status: TaskStatus,
    pub reason: String,
    pub exit_code: i32,
}
