// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised at the engine's own API boundary (queueing, cancellation).
/// Per-task failures (malformed command, spawn failure, ...) are not errors
/// here — they become `Failed` status events, per spec §7's propagation
/// policy.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a job for task {0} already exists")]
    DuplicateJob(i64),

    #[error("task queue is closed")]
    QueueClosed,

    #[error("task queue is full")]
    QueueFull,

    #[error("no running job for task {0}")]
    NotRunning(i64),

    #[error(transparent)]
    Store(#[from] ote_storage::StoreError),
}
