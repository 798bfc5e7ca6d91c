// SPDX-License-Identifier: MIT

//! `{success, code, data, error, message}` envelope (spec §6), grounded on
//! `original_source/dto/base_response.go`'s `BaseResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub code: u16,
    pub data: Value,
    pub error: String,
    pub message: String,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    let body = Envelope {
        success: true,
        code: StatusCode::OK.as_u16(),
        data: serde_json::to_value(data).unwrap_or(Value::Null),
        error: String::new(),
        message: String::new(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    let body = Envelope {
        success: false,
        code: status.as_u16(),
        data: Value::Null,
        error: message.clone(),
        message,
    };
    (status, Json(body)).into_response()
}
