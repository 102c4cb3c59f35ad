// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST handlers.

pub mod auth;
pub mod execute;
pub mod queues;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// FastAPI-compatible error shape: `{"detail": "..."}` with a status.
pub(crate) fn api_error(status: StatusCode, detail: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": detail.into() })))
}

pub(crate) type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;
