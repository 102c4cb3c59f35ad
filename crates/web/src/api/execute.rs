// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution-control endpoints.

use super::{api_error, ApiResult};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tf_core::{collapse_progress_lines, last_n_lines, TaskId};
use tf_engine::{FoundTask, TaskQueue};

#[derive(Deserialize)]
pub struct QueueSelector {
    pub queue_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LinesQuery {
    #[serde(default = "default_lines")]
    pub lines: usize,
}

fn default_lines() -> usize {
    500
}

#[derive(Deserialize)]
pub struct SelectedTask {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Deserialize)]
pub struct LoadSelectedBody {
    pub tasks: Vec<SelectedTask>,
}

/// Resolve the target queue: explicit id, else the primary queue.
fn target_queue(
    state: &AppState,
    queue_id: Option<&str>,
) -> Result<Arc<TaskQueue>, (StatusCode, Json<serde_json::Value>)> {
    let queue = match queue_id {
        Some(id) => state.workspace.queue(&id.into()),
        None => state.workspace.primary_queue(),
    };
    queue.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "add a task queue first"))
}

fn queue_holding(
    state: &AppState,
    task_id: &TaskId,
) -> Result<Arc<TaskQueue>, (StatusCode, Json<serde_json::Value>)> {
    state
        .workspace
        .queue_for_task(task_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "task not found"))
}

/// POST /api/tasks/{tid}/run
///
/// Device conflicts come back as a 400 naming the devices and holder.
pub async fn run_task(State(state): State<AppState>, Path(tid): Path<String>) -> ApiResult {
    let task_id = TaskId::new(tid);
    let queue = queue_holding(&state, &task_id)?;
    let task = queue
        .start_task(&task_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("task {} started", task.name),
        "task": task,
    })))
}

/// POST /api/tasks/{tid}/stop
pub async fn stop_task(State(state): State<AppState>, Path(tid): Path<String>) -> ApiResult {
    let task_id = TaskId::new(tid);
    let queue = queue_holding(&state, &task_id)?;
    queue
        .stop_task(&task_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({ "success": true, "message": "task stopping" })))
}

/// POST /api/tasks/{tid}/retry
pub async fn retry_task(State(state): State<AppState>, Path(tid): Path<String>) -> ApiResult {
    let task_id = TaskId::new(tid);
    let queue = queue_holding(&state, &task_id)?;
    let task = queue
        .retry(&task_id)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("task {} queued at the tail", task.name),
        "task": task,
    })))
}

/// POST /api/stop-all
pub async fn stop_all(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stopped = state.workspace.stop_all();
    Json(json!({
        "success": true,
        "message": format!("stop requested for {stopped} running task(s)"),
    }))
}

/// POST /api/start-queue
pub async fn start_queue(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
) -> ApiResult {
    let queue = target_queue(&state, selector.queue_id.as_deref())?;
    if queue.auto_running() {
        return Ok(Json(json!({
            "success": false,
            "message": "queue is already running",
        })));
    }
    let status = queue.status();
    queue.start_auto();

    let message = if status.pending_count > 0 {
        format!("queue started, {} task(s) pending", status.pending_count)
    } else if status.running_count > 0 {
        format!("queue started, {} task(s) running", status.running_count)
    } else {
        "queue started, waiting for tasks".to_string()
    };
    Ok(Json(json!({ "success": true, "message": message })))
}

/// POST /api/stop-queue
pub async fn stop_queue(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
) -> ApiResult {
    let queue = target_queue(&state, selector.queue_id.as_deref())?;
    queue.stop_auto();
    Ok(Json(json!({
        "success": true,
        "message": "queue will stop after the current task",
    })))
}

/// GET /api/queue-status
pub async fn queue_status(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
) -> Json<serde_json::Value> {
    match target_queue(&state, selector.queue_id.as_deref()) {
        Ok(queue) => {
            let status = queue.status();
            Json(json!({
                "running": status.auto_running,
                "pending_count": status.pending_count,
                "running_count": status.running_count,
                "main_log_file": state.main_log,
            }))
        }
        Err(_) => Json(json!({
            "running": false,
            "pending_count": 0,
            "running_count": 0,
            "main_log_file": state.main_log,
        })),
    }
}

/// GET /api/main-log?lines=N
pub async fn main_log(
    State(state): State<AppState>,
    Query(query): Query<LinesQuery>,
) -> ApiResult {
    let Some(path) = &state.main_log else {
        return Ok(Json(json!({
            "success": true,
            "content": "add a task queue first",
            "log_file": null,
        })));
    };
    if !path.exists() {
        return Ok(Json(json!({
            "success": true,
            "content": "backend log is initialising...",
            "log_file": path,
        })));
    }
    let (content, total_lines) = read_sanitised(path, query.lines)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to read log: {e}")))?;
    Ok(Json(json!({
        "success": true,
        "content": content,
        "log_file": path,
        "total_lines": total_lines,
    })))
}

/// POST /api/reload
pub async fn reload(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
) -> ApiResult {
    let queue = target_queue(&state, selector.queue_id.as_deref())?;
    let outcome = queue
        .reload()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("reloaded {} task(s)", outcome.loaded),
        "loaded": outcome.loaded,
        "rejected": outcome.rejected,
    })))
}

/// GET /api/check-yaml
pub async fn check_yaml(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
) -> ApiResult {
    let queue = target_queue(&state, selector.queue_id.as_deref())?;
    match queue.check_updates() {
        Ok(report) => {
            let valid_count = report.new_tasks.iter().filter(|t| t.valid).count();
            let invalid_count = report.new_tasks.len() - valid_count;
            Ok(Json(json!({
                "success": true,
                "error": null,
                "total_in_yaml": report.total_in_yaml,
                "new_tasks": report.new_tasks,
                "valid_count": valid_count,
                "invalid_count": invalid_count,
            })))
        }
        Err(e) => Ok(Json(json!({
            "success": false,
            "error": e.to_string(),
            "total_in_yaml": 0,
            "new_tasks": [],
            "valid_count": 0,
            "invalid_count": 0,
        }))),
    }
}

/// POST /api/load-new-tasks
pub async fn load_new_tasks(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
) -> ApiResult {
    let queue = target_queue(&state, selector.queue_id.as_deref())?;
    let outcome = queue
        .load_new_tasks()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut message_parts = Vec::new();
    if outcome.loaded > 0 {
        message_parts.push(format!("loaded {} new task(s)", outcome.loaded));
    }
    if !outcome.rejected.is_empty() {
        message_parts.push(format!("rejected {}", outcome.rejected.len()));
    }
    if message_parts.is_empty() {
        message_parts.push("no new tasks found".to_string());
    }
    Ok(Json(json!({
        "success": true,
        "message": message_parts.join(", "),
        "loaded": outcome.loaded,
        "skipped": outcome.skipped,
        "errors": outcome.rejected,
    })))
}

/// POST /api/load-selected-tasks
pub async fn load_selected_tasks(
    State(state): State<AppState>,
    Query(selector): Query<QueueSelector>,
    Json(body): Json<LoadSelectedBody>,
) -> ApiResult {
    let queue = target_queue(&state, selector.queue_id.as_deref())?;
    let entries = body
        .tasks
        .into_iter()
        .map(|t| tf_config::TaskEntry {
            name: t.name,
            command: t.command,
            note: (!t.note.is_empty()).then_some(t.note),
            ..Default::default()
        })
        .collect();
    let outcome = queue
        .load_selected(entries)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "loaded {} task(s), skipped {} duplicate(s)",
            outcome.loaded, outcome.skipped
        ),
        "loaded": outcome.loaded,
        "skipped": outcome.skipped,
        "errors": outcome.rejected,
    })))
}

/// GET /api/logs/{tid}?lines=N
///
/// Replays the task's log with progress-bar redraws collapsed. A task
/// whose file is missing yields a placeholder, not an error.
pub async fn task_log(
    State(state): State<AppState>,
    Path(tid): Path<String>,
    Query(query): Query<LinesQuery>,
) -> ApiResult {
    let task_id = TaskId::new(tid);
    let log_path = match state.workspace.find_task(&task_id) {
        Some(FoundTask::Live { task, .. }) => task.log_path,
        Some(FoundTask::Historical { record, .. }) => record.log_path,
        None => return Err(api_error(StatusCode::NOT_FOUND, "task not found")),
    };

    let Some(path) = log_path.filter(|p| p.exists()) else {
        return Ok(Json(json!({
            "success": true,
            "log_file": null,
            "content": "(log not available)",
            "total_lines": 0,
        })));
    };

    let (content, total_lines) = read_sanitised(&path, query.lines)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to read log: {e}")))?;
    Ok(Json(json!({
        "success": true,
        "log_file": path,
        "content": content,
        "total_lines": total_lines,
    })))
}

/// Read a log file, collapse progress redraws, keep the last `lines`.
fn read_sanitised(path: &std::path::Path, lines: usize) -> std::io::Result<(String, usize)> {
    let bytes = std::fs::read(path)?;
    let cleaned = collapse_progress_lines(&String::from_utf8_lossy(&bytes));
    let total_lines = cleaned.lines().count();
    Ok((last_n_lines(&cleaned, lines), total_lines))
}
