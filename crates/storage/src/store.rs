// SPDX-License-Identifier: MIT

use crate::error::StoreError;
use async_trait::async_trait;
use ote_core::{Task, TaskStatus};

/// A page of `list`, ordered by `created_at` descending, plus the total
/// count matching the filter (ignoring pagination).
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
}

/// Pure data access for tasks (spec §4.7). No business logic, no queueing
/// decisions — that's the Task Manager's job. All terminal transitions
/// (`task_completed`/`task_failed`/`task_cancelled`) are required to be a
/// single atomic update.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task, StoreError>;

    async fn get(&self, id: i64) -> Result<Task, StoreError>;

    async fn list(
        &self,
        offset: i64,
        limit: i64,
        status_filter: Option<TaskStatus>,
    ) -> Result<TaskPage, StoreError>;

    /// Tasks still `Queued`, paginated. Used by the Task Manager at startup
    /// to rebuild the in-memory queue from persisted intent (spec §4.5
    /// crash recovery).
    async fn list_queued(&self, offset: i64, limit: i64) -> Result<Vec<Task>, StoreError>;

    async fn task_running(&self, id: i64) -> Result<(), StoreError>;

    async fn task_completed(&self, id: i64, exit_code: i32) -> Result<(), StoreError>;

    async fn task_failed(&self, id: i64, reason: &str, exit_code: i32) -> Result<(), StoreError>;

    async fn task_cancelled(&self, id: i64, reason: &str, exit_code: i32)
        -> Result<(), StoreError>;
}
