// SPDX-License-Identifier: MIT

//! `GET /tasks/{id}/logs` and `GET /tasks/{id}/logs/download` (spec §6),
//! grounded on `original_source/handler/task_logs.go`.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use ote_core::TaskStatus;
use ote_engine::log_file_path;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::response::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LogRangeQuery {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

/// `from`/`to` must both be zero, or both positive with `from < to` (spec §6).
fn validate_range(query: &LogRangeQuery) -> Result<(u64, u64), ApiError> {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(0);
    match (from, to) {
        (0, 0) => Ok((0, 0)),
        (f, t) if f > 0 && t > 0 && f < t => Ok((f, t)),
        _ => Err(ApiError::Validation(
            "from and to must both be zero, or both positive with from < to".into(),
        )),
    }
}

pub async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LogRangeQuery>,
) -> Result<Response, ApiError> {
    let (from, to) = validate_range(&query)?;
    let (logs, total_lines) = state
        .manager
        .read_logs(id, from, to)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(ok(serde_json::json!({
        "logs": logs,
        "total_lines": total_lines,
    })))
}

pub async fn download_logs(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let task = state.manager.get_task(id).await?;
    if matches!(task.status, TaskStatus::Queued | TaskStatus::Running) {
        return Err(ApiError::Validation(
            "log file is not final while the task is queued or running".into(),
        ));
    }

    let path = log_file_path(&state.task_logger_dir_path, id);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("no log file for task {id}")))?;
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{id}.log\""),
        )
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}
