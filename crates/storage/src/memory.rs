// SPDX-License-Identifier: MIT

use crate::error::StoreError;
use crate::store::{TaskPage, TaskStore};
use async_trait::async_trait;
use chrono::Utc;
use ote_core::{Task, TaskStatus};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory `TaskStore`, used by engine/server tests. Ordering and
/// pagination semantics mirror `SqliteTaskStore` exactly so tests can run
/// against either backend.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicI64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, mut task: Task) -> Result<Task, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        task.id = id;
        self.tasks.lock().push(task.clone());
        Ok(task)
    }

    async fn get(&self, id: i64) -> Result<Task, StoreError> {
        self.tasks
            .lock()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(
        &self,
        offset: i64,
        limit: i64,
        status_filter: Option<TaskStatus>,
    ) -> Result<TaskPage, StoreError> {
        let tasks = self.tasks.lock();
        let mut matching: Vec<&Task> = tasks
            .iter()
            .filter(|t| status_filter.is_none_or(|s| t.status == s))
            .collect();
        matching.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(TaskPage { tasks: page, total })
    }

    async fn list_queued(&self, offset: i64, limit: i64) -> Result<Vec<Task>, StoreError> {
        let page = self
            .list(offset, limit, Some(TaskStatus::Queued))
            .await?;
        Ok(page.tasks)
    }

    async fn task_running(&self, id: i64) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.status = TaskStatus::Running;
        task.start_time = Utc::now().timestamp();
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn task_completed(&self, id: i64, exit_code: i32) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.status = TaskStatus::Completed;
        task.exit_code = exit_code;
        task.end_time = Utc::now().timestamp();
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn task_failed(&self, id: i64, reason: &str, exit_code: i32) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.status = TaskStatus::Failed;
        task.reason = reason.to_string();
        task.exit_code = exit_code;
        task.end_time = Utc::now().timestamp();
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn task_cancelled(
        &self,
        id: i64,
        reason: &str,
        exit_code: i32,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.status = TaskStatus::Cancelled;
        task.reason = reason.to_string();
        task.exit_code = exit_code;
        task.end_time = Utc::now().timestamp();
        task.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_monotonic_ids() {
        let store = InMemoryTaskStore::new();
        let t1 = store
            .create(Task::new_queued("a".into(), "echo a".into(), Utc::now()))
            .await
            .unwrap();
        let t2 = store
            .create(Task::new_queued("b".into(), "echo b".into(), Utc::now()))
            .await
            .unwrap();
        assert!(t2.id > t1.id);
    }

    #[tokio::test]
    async fn list_orders_by_created_at_desc_and_filters_by_status() {
        let store = InMemoryTaskStore::new();
        let t1 = store
            .create(Task::new_queued("a".into(), "echo a".into(), Utc::now()))
            .await
            .unwrap();
        let t2 = store
            .create(Task::new_queued("b".into(), "echo b".into(), Utc::now()))
            .await
            .unwrap();
        store.task_running(t2.id).await.unwrap();

        let page = store.list(0, 10, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.tasks[0].id, t2.id);
        assert_eq!(page.tasks[1].id, t1.id);

        let running_only = store
            .list(0, 10, Some(TaskStatus::Running))
            .await
            .unwrap();
        assert_eq!(running_only.total, 1);
        assert_eq!(running_only.tasks[0].id, t2.id);
    }

    #[tokio::test]
    async fn terminal_transitions_set_end_time_and_exit_code() {
        let store = InMemoryTaskStore::new();
        let t = store
            .create(Task::new_queued("a".into(), "echo a".into(), Utc::now()))
            .await
            .unwrap();
        store.task_running(t.id).await.unwrap();
        store.task_failed(t.id, "boom", 3).await.unwrap();

        let got = store.get(t.id).await.unwrap();
        assert_eq!(got.status, TaskStatus::Failed);
        assert_eq!(got.exit_code, 3);
        assert_eq!(got.reason, "boom");
        assert!(got.end_time > 0);
        assert!(got.start_time > 0);
    }
}
