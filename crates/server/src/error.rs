// SPDX-License-Identifier: MIT

//! HTTP-layer errors: request-shape problems and lookup misses only (spec
//! §7's propagation policy — command/spawn failures never surface here,
//! they become task-terminal states).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ote_engine::EngineError;
use ote_storage::StoreError;
use thiserror::Error;

use crate::response::fail;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => fail(StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => fail(StatusCode::NOT_FOUND, msg),
            // Matches source behavior: duplicate enqueue and cancel-on-non-running
            // are reported as 500, not 409, despite being conflicts in spirit.
            ApiError::Conflict(msg) => fail(StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Internal(msg) => fail(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(format!("task {id} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::DuplicateJob(_) => ApiError::Conflict(e.to_string()),
            EngineError::NotRunning(_) => ApiError::Conflict(e.to_string()),
            EngineError::QueueClosed | EngineError::QueueFull => ApiError::Internal(e.to_string()),
            EngineError::Store(inner) => inner.into(),
        }
    }
}
