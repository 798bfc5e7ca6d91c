// SPDX-License-Identifier: MIT

//! Central coordinator: queue admission, dispatch, status FSM, persistence
//! ordering, crash recovery, and shutdown (spec §4.5).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ote_core::{StatusEvent, Task, TaskStatus};
use ote_storage::{TaskPage, TaskStore};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::event_hub::EventHub;
use crate::executor::{self, TaskUpdate};
use crate::job::Job;
use crate::log_reader::LogReader;

const QUEUE_CAPACITY: usize = 1000;
const UPDATE_CHANNEL_CAPACITY: usize = 1000;
const CRASH_RECOVERY_BATCH: i64 = 100;

struct RegisteredJob {
    job: Job,
    handle: JoinHandle<()>,
}

/// Owns the queue, the job registry, the task-update channel, and
/// constructor-time references to the Task Store, Log Reader, and Event
/// Hub. Exists only as `Arc<Manager>`: the dispatcher/listener task and
/// every Executor it spawns hold a clone.
pub struct Manager {
    store: Arc<dyn TaskStore>,
    hub: Arc<EventHub>,
    log_reader: LogReader,
    log_dir: PathBuf,
    validate: bool,
    registry: RwLock<HashMap<i64, RegisteredJob>>,
    queue_tx: RwLock<Option<mpsc::Sender<Task>>>,
    update_tx: RwLock<Option<mpsc::Sender<TaskUpdate>>>,
    listener: RwLock<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Build the manager, replay persisted `Queued` tasks into a fresh
    /// in-memory queue (spec §4.5 crash recovery, batch 100), then start
    /// the single dispatcher/listener task.
    pub async fn start(
        store: Arc<dyn TaskStore>,
        hub: Arc<EventHub>,
        log_dir: PathBuf,
        validate: bool,
    ) -> Result<Arc<Self>, EngineError> {
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let log_reader = LogReader::new(log_dir.clone());

        let manager = Arc::new(Self {
            store,
            hub,
            log_reader,
            log_dir,
            validate,
            registry: RwLock::new(HashMap::new()),
            queue_tx: RwLock::new(Some(queue_tx.clone())),
            update_tx: RwLock::new(Some(update_tx)),
            listener: RwLock::new(None),
        });

        manager.recover_queued(&queue_tx).await?;

        let listener_manager = manager.clone();
        let handle = tokio::spawn(async move {
            listener_manager.run_listener(queue_rx, update_rx).await;
        });
        *manager.listener.write() = Some(handle);

        Ok(manager)
    }

    async fn recover_queued(&self, queue_tx: &mpsc::Sender<Task>) -> Result<(), EngineError> {
        let mut offset = 0;
        loop {
            let batch = self.store.list_queued(offset, CRASH_RECOVERY_BATCH).await?;
            if batch.is_empty() {
                break;
            }
            let n = batch.len() as i64;
            for task in batch {
                if queue_tx.send(task.clone()).await.is_err() {
                    warn!(task_id = task.id, "queue closed during crash recovery");
                }
            }
            offset += n;
            if n < CRASH_RECOVERY_BATCH {
                break;
            }
        }
        Ok(())
    }

    /// Persist a brand-new task with status=Queued. Does not enqueue it.
    pub async fn create_task(&self, name: String, command: String) -> Result<Task, EngineError> {
        let now = chrono::Utc::now();
        let task = Task::new_queued(name, command, now);
        Ok(self.store.create(task).await?)
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, EngineError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list_tasks(
        &self,
        offset: i64,
        limit: i64,
        status_filter: Option<TaskStatus>,
    ) -> Result<TaskPage, EngineError> {
        Ok(self.store.list(offset, limit, status_filter).await?)
    }

    /// Validate and push a task onto the in-memory dispatch queue.
    pub async fn queue_task(&self, task: &Task) -> Result<(), EngineError> {
        if self.registry.read().contains_key(&task.id) {
            return Err(EngineError::DuplicateJob(task.id));
        }
        let tx = {
            let guard = self.queue_tx.read();
            guard.as_ref().cloned().ok_or(EngineError::QueueClosed)?
        };
        match tx.try_send(task.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(EngineError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EngineError::QueueClosed),
        }
    }

    /// Signal cancellation for a running task. The terminal `Cancelled`
    /// event arrives later through the normal listener path.
    pub fn cancel_task(&self, task_id: i64) -> Result<(), EngineError> {
        let registry = self.registry.read();
        match registry.get(&task_id) {
            Some(registered) => {
                registered.job.cancel();
                Ok(())
            }
            None => Err(EngineError::NotRunning(task_id)),
        }
    }

    pub fn read_logs(
        &self,
        task_id: i64,
        from: u64,
        to: u64,
    ) -> std::io::Result<(Vec<String>, u64)> {
        self.log_reader.read(task_id, from, to)
    }

    pub fn subscribe(&self) -> (u64, crate::event_hub::Subscription) {
        self.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: u64) {
        self.hub.unsubscribe(id);
    }

    fn dispatch(self: &Arc<Self>, task: Task) {
        let task_id = task.id;
        let Some(update_tx) = self.update_tx.read().clone() else {
            warn!(task_id, "dropping dequeued task: update channel already closed");
            return;
        };
        let (job, job_handle) = Job::new();
        let handle = tokio::spawn(executor::run(
            task,
            self.log_dir.clone(),
            self.validate,
            self.hub.clone(),
            update_tx,
            job_handle,
        ));
        self.registry
            .write()
            .insert(task_id, RegisteredJob { job, handle });
    }

    async fn apply_update(&self, update: TaskUpdate) {
        let task_id = update.task_id();
        let status = update.status();

        let store_result = match &update {
            TaskUpdate::Running { .. } => self.store.task_running(task_id).await,
            TaskUpdate::Completed { exit_code, .. } => {
                self.store.task_completed(task_id, *exit_code).await
            }
            TaskUpdate::Failed {
                reason, exit_code, ..
            } => self.store.task_failed(task_id, reason, *exit_code).await,
            TaskUpdate::Cancelled {
                reason, exit_code, ..
            } => {
                self.store
                    .task_cancelled(task_id, reason, *exit_code)
                    .await
            }
        };
        if let Err(e) = store_result {
            error!(task_id, error = %e, "failed to persist task status");
        }

        let (reason, exit_code) = match &update {
            TaskUpdate::Running { .. } => (String::new(), 0),
            TaskUpdate::Completed { exit_code, .. } => (String::new(), *exit_code),
            TaskUpdate::Failed {
                reason, exit_code, ..
            }
            | TaskUpdate::Cancelled {
                reason, exit_code, ..
            } => (reason.clone(), *exit_code),
        };
        self.hub.publish_status(StatusEvent {
            task_id,
            status,
            reason,
            exit_code,
        });

        if status.is_terminal() {
            self.registry.write().remove(&task_id);
        }
    }

    async fn run_listener(
        self: Arc<Self>,
        mut queue_rx: mpsc::Receiver<Task>,
        mut update_rx: mpsc::Receiver<TaskUpdate>,
    ) {
        let mut queue_open = true;
        loop {
            tokio::select! {
                maybe_task = queue_rx.recv(), if queue_open => {
                    match maybe_task {
                        Some(task) => {
                            info!(task_id = task.id, "dispatching task");
                            self.dispatch(task);
                        }
                        None => queue_open = false,
                    }
                }
                maybe_update = update_rx.recv() => {
                    match maybe_update {
                        Some(update) => self.apply_update(update).await,
                        None => break,
                    }
                }
            }
        }
        info!("task manager listener stopped");
    }

    /// Graceful shutdown: close admission, cancel every live job, wait for
    /// their terminal events to drain through the listener, then stop the
    /// listener itself.
    pub async fn stop(&self) {
        self.queue_tx.write().take();

        let handles: Vec<JoinHandle<()>> = {
            let mut registry = self.registry.write();
            for registered in registry.values() {
                registered.job.cancel();
            }
            registry.drain().map(|(_, r)| r.handle).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }

        self.update_tx.write().take();

        let listener = self.listener.write().take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }
}
