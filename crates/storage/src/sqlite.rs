// SPDX-License-Identifier: MIT

use crate::error::StoreError;
use crate::store::{TaskPage, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ote_core::{Task, TaskStatus};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Pool sizing, mirroring the `DB_*` environment variables in spec §6.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub max_conn_lifetime: Duration,
}

/// SQLite-backed `TaskStore`, pooled via `r2d2`. Blocking `rusqlite` calls
/// run on `spawn_blocking` so the async engine never stalls on disk I/O.
pub struct SqliteTaskStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteTaskStore {
    /// Connect with a 3-attempt exponential backoff (2s base, doubling) and
    /// a 5s ping timeout per attempt, per spec §5 Timeouts.
    pub async fn connect(cfg: SqliteConfig) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(&cfg.path);
        let pool = Pool::builder()
            .max_size(cfg.max_open_conns.max(1))
            .min_idle(Some(cfg.max_idle_conns))
            .max_lifetime(Some(cfg.max_conn_lifetime))
            .build(manager)
            .map_err(|e| StoreError::ConnectFailed(e.to_string()))?;

        let mut backoff = Duration::from_secs(2);
        let mut last_err = String::new();
        for attempt in 1..=3 {
            let pool_clone = pool.clone();
            let ping = tokio::time::timeout(
                Duration::from_secs(5),
                tokio::task::spawn_blocking(move || -> Result<(), String> {
                    let conn = pool_clone.get().map_err(|e| e.to_string())?;
                    conn.execute_batch("SELECT 1").map_err(|e| e.to_string())
                }),
            )
            .await;

            match ping {
                Ok(Ok(Ok(()))) => {
                    info!(attempt, "database connection established");
                    let store = Self { pool };
                    store.migrate().await?;
                    return Ok(store);
                }
                Ok(Ok(Err(e))) => last_err = e,
                Ok(Err(join_err)) => last_err = join_err.to_string(),
                Err(_) => last_err = "ping timed out after 5s".to_string(),
            }

            warn!(attempt, error = %last_err, "database ping failed, retrying");
            if attempt < 3 {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        Err(StoreError::ConnectFailed(last_err))
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = pool.get()?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    command TEXT NOT NULL,
                    status INTEGER NOT NULL,
                    reason TEXT NOT NULL DEFAULT '',
                    exit_code INTEGER NOT NULL DEFAULT 0,
                    start_time INTEGER NOT NULL DEFAULT 0,
                    end_time INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
                CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);",
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
    }
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status_raw: i64 = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        command: row.get("command")?,
        status: TaskStatus::from_i64(status_raw).unwrap_or(TaskStatus::Queued),
        reason: row.get("reason")?,
        exit_code: row.get("exit_code")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        created_at: parse_rfc3339(&created_at),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap())
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tasks (name, command, status, reason, exit_code, start_time, end_time, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    task.name,
                    task.command,
                    task.status as i64,
                    task.reason,
                    task.exit_code,
                    task.start_time,
                    task.end_time,
                    task.created_at.to_rfc3339(),
                    task.updated_at.to_rfc3339(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Task { id, ..task })
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Task, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id], row_to_task)
                .optional()?
                .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn list(
        &self,
        offset: i64,
        limit: i64,
        status_filter: Option<TaskStatus>,
    ) -> Result<TaskPage, StoreError> {
        self.with_conn(move |conn| {
            let total: i64 = match status_filter {
                Some(s) => conn.query_row(
                    "SELECT COUNT(*) FROM tasks WHERE status = ?1",
                    params![s as i64],
                    |r| r.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))?,
            };

            let mut stmt = match status_filter {
                Some(_) => conn.prepare(
                    "SELECT * FROM tasks WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                )?,
                None => conn.prepare(
                    "SELECT * FROM tasks ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                )?,
            };

            let tasks = match status_filter {
                Some(s) => stmt
                    .query_map(params![s as i64, limit, offset], row_to_task)?
                    .collect::<Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map(params![limit, offset], row_to_task)?
                    .collect::<Result<Vec<_>, _>>()?,
            };

            Ok(TaskPage { tasks, total })
        })
        .await
    }

    async fn list_queued(&self, offset: i64, limit: i64) -> Result<Vec<Task>, StoreError> {
        let page = self.list(offset, limit, Some(TaskStatus::Queued)).await?;
        Ok(page.tasks)
    }

    async fn task_running(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            let n = conn.execute(
                "UPDATE tasks SET status = ?1, start_time = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    TaskStatus::Running as i64,
                    now.timestamp(),
                    now.to_rfc3339(),
                    id
                ],
            )?;
            if n == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn task_completed(&self, id: i64, exit_code: i32) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            let n = conn.execute(
                "UPDATE tasks SET status = ?1, exit_code = ?2, end_time = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    TaskStatus::Completed as i64,
                    exit_code,
                    now.timestamp(),
                    now.to_rfc3339(),
                    id
                ],
            )?;
            if n == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn task_failed(&self, id: i64, reason: &str, exit_code: i32) -> Result<(), StoreError> {
        let reason = reason.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now();
            let n = conn.execute(
                "UPDATE tasks SET status = ?1, reason = ?2, exit_code = ?3, end_time = ?4, updated_at = ?5 WHERE id = ?6",
                params![
                    TaskStatus::Failed as i64,
                    reason,
                    exit_code,
                    now.timestamp(),
                    now.to_rfc3339(),
                    id
                ],
            )?;
            if n == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn task_cancelled(
        &self,
        id: i64,
        reason: &str,
        exit_code: i32,
    ) -> Result<(), StoreError> {
        let reason = reason.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now();
            let n = conn.execute(
                "UPDATE tasks SET status = ?1, reason = ?2, exit_code = ?3, end_time = ?4, updated_at = ?5 WHERE id = ?6",
                params![
                    TaskStatus::Cancelled as i64,
                    reason,
                    exit_code,
                    now.timestamp(),
                    now.to_rfc3339(),
                    id
                ],
            )?;
            if n == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteTaskStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        std::mem::forget(dir);
        SqliteTaskStore::connect(SqliteConfig {
            path,
            max_idle_conns: 2,
            max_open_conns: 5,
            max_conn_lifetime: Duration::from_secs(10),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = test_store().await;
        let created = store
            .create(Task::new_queued("t".into(), "echo hi".into(), Utc::now()))
            .await
            .unwrap();
        let got = store.get(created.id).await.unwrap();
        assert_eq!(got.name, "t");
        assert_eq!(got.status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn terminal_update_is_atomic_and_visible() {
        let store = test_store().await;
        let t = store
            .create(Task::new_queued("t".into(), "echo hi".into(), Utc::now()))
            .await
            .unwrap();
        store.task_running(t.id).await.unwrap();
        store.task_completed(t.id, 0).await.unwrap();

        let got = store.get(t.id).await.unwrap();
        assert_eq!(got.status, TaskStatus::Completed);
        assert_eq!(got.exit_code, 0);
        assert!(got.start_time > 0);
        assert!(got.end_time > 0);
    }

    #[tokio::test]
    async fn list_paginates_and_filters() {
        let store = test_store().await;
        for i in 0..5 {
            store
                .create(Task::new_queued(format!("t{i}"), "echo hi".into(), Utc::now()))
                .await
                .unwrap();
        }
        let page = store.list(0, 2, None).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.tasks.len(), 2);
    }
}
