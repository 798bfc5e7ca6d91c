// SPDX-License-Identifier: MIT

//! In-memory handle for an active task (spec §3 "Job"). Created at dispatch,
//! stored in the Task Manager's job registry keyed by task id, removed on
//! any terminal state emission.

use tokio::sync::watch;

/// Owned by the Executor; the Manager holds only this cancellation sender
/// (a "weak handle for cancellation lookup" per spec §3 ownership rules).
#[derive(Clone)]
pub struct Job {
    cancel_tx: watch::Sender<bool>,
}

/// The Executor's half: observes the cancel signal and reports completion
/// by simply dropping, which the registry already handles via removal.
pub struct JobHandle {
    pub cancel_rx: watch::Receiver<bool>,
}

impl Job {
    pub fn new() -> (Self, JobHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (Self { cancel_tx }, JobHandle { cancel_rx })
    }

    /// Signal cancellation. Idempotent: cancelling an already-cancelled (or
    /// already-terminal, soon-to-be-removed) job is a no-op.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}
