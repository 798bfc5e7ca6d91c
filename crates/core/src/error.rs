// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Error kinds shared across the workspace, grounded in spec §7's table.
/// `ote-storage` and `ote-engine` each define narrower errors for their own
/// internal failure modes and convert into these at the crate boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("malformed command: {0}")]
    MalformedCommand(String),

    #[error("malicious command: {0}")]
    MaliciousCommand(String),

    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error("failed to initialize log file: {0}")]
    LogInitFailed(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}
