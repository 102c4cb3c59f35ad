// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue management endpoints.

use super::{api_error, ApiResult};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tf_core::QueueId;

#[derive(Deserialize)]
pub struct CreateQueueBody {
    pub name: String,
    pub yaml_path: String,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    100
}

/// GET /api/queues
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "queues": state.workspace.list_queues(),
    }))
}

/// POST /api/queues
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateQueueBody>,
) -> ApiResult {
    let entry = state
        .workspace
        .add_queue(&body.name, std::path::Path::new(&body.yaml_path))
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("queue {} added", entry.name),
        "queue": entry,
    })))
}

/// DELETE /api/queues/{qid}
pub async fn remove(State(state): State<AppState>, Path(qid): Path<String>) -> ApiResult {
    state
        .workspace
        .remove_queue(&QueueId::new(qid))
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({ "success": true, "message": "queue removed" })))
}

/// GET /api/queues/{qid}/tasks
pub async fn tasks(State(state): State<AppState>, Path(qid): Path<String>) -> ApiResult {
    let queue = state
        .workspace
        .queue(&QueueId::new(qid))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "queue not found"))?;
    Ok(Json(json!({
        "success": true,
        "tasks": queue.tasks(),
        "auto_running": queue.auto_running(),
    })))
}

/// GET /api/queues/{qid}/history
pub async fn history(
    State(state): State<AppState>,
    Path(qid): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let queue = state
        .workspace
        .queue(&QueueId::new(qid))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "queue not found"))?;
    Ok(Json(json!({
        "success": true,
        "history": queue.history_recent(query.limit),
        "total": queue.history_count(),
    })))
}
