// SPDX-License-Identifier: MIT

//! `POST /tasks`, `GET /tasks`, `GET /tasks/{id}`, `DELETE /tasks/{id}/cancel`
//! (spec §6), grounded on `original_source/handler/task.go`.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use ote_core::TaskStatus;
use serde::Deserialize;

use crate::error::ApiError;
use crate::response::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub command: String,
}

pub async fn create_task(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<CreateTaskRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() || body.command.trim().is_empty() {
        return Err(ApiError::Validation(
            "name and command are both required".into(),
        ));
    }

    let task = state.manager.create_task(body.name, body.command).await?;
    state.manager.queue_task(&task).await?;
    Ok(ok(task))
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Response, ApiError> {
    let offset = query.offset.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let status_filter = match query.status {
        Some(raw) => Some(parse_status(&raw)?),
        None => None,
    };

    let page = state
        .manager
        .list_tasks(offset, limit, status_filter)
        .await?;
    Ok(ok(serde_json::json!({
        "tasks": page.tasks,
        "total": page.total,
    })))
}

fn parse_status(raw: &str) -> Result<TaskStatus, ApiError> {
    match raw.to_ascii_lowercase().as_str() {
        "queued" => Ok(TaskStatus::Queued),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
        other => Err(ApiError::Validation(format!("unknown status: {other}"))),
    }
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let task = state.manager.get_task(id).await?;
    Ok(ok(task))
}

pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.manager.cancel_task(id)?;
    Ok(ok(serde_json::Value::Null))
}
