// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered task lifecycle status. Ordering matters: `Queued < Running <
/// Completed < Failed < Cancelled` mirrors the source system's integer
/// encoding and is relied on by the status query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskStatus {
    Queued = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(TaskStatus::Queued),
            2 => Some(TaskStatus::Running),
            3 => Some(TaskStatus::Completed),
            4 => Some(TaskStatus::Failed),
            5 => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

/// The persistent unit of work. See spec §3 for the invariants this type
/// must uphold: `start_time > 0` iff ever Running, `end_time > 0` iff
/// terminal, `exit_code` meaningful only in terminal states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub command: String,
    pub status: TaskStatus,
    pub reason: String,
    pub exit_code: i32,
    pub start_time: i64,
    pub end_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a freshly-admitted task (status=Queued, no timestamps set yet
    /// beyond created_at/updated_at). The store assigns `id`.
    pub fn new_queued(name: String, command: String, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            name,
            command,
            status: TaskStatus::Queued,
            reason: String::new(),
            exit_code: 0,
            start_time: 0,
            end_time: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_matches_spec() {
        assert!(TaskStatus::Queued < TaskStatus::Running);
        assert!(TaskStatus::Running < TaskStatus::Completed);
        assert!(TaskStatus::Completed < TaskStatus::Failed);
        assert!(TaskStatus::Failed < TaskStatus::Cancelled);
    }

    #[test]
    fn only_terminal_states_are_terminal() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }
}
