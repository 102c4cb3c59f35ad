// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket endpoints: live log streaming and status broadcasting.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::sink::SinkExt;
use serde_json::json;
use std::time::Duration;
use tf_core::TaskId;
use tf_engine::{LogFrame, LogTailer};

/// Status snapshots are re-evaluated at this cadence and sent only when
/// they differ from the last one delivered.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// WS /ws/logs/{tid}
pub async fn logs(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| stream_logs(socket, state, TaskId::new(tid)))
}

async fn stream_logs(mut socket: WebSocket, state: AppState, task_id: TaskId) {
    let mut frames = LogTailer::new(state.workspace, task_id).subscribe();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { return };
                let done = matches!(frame, LogFrame::End { .. });
                let payload = frame_json(&frame);
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    // Subscriber cannot keep up or went away; the tailer
                    // stops once its channel closes.
                    return;
                }
                if done {
                    let _ = socket.close().await;
                    return;
                }
            }
            incoming = socket.recv() => {
                // Any close (or error) from the client tears the stream down.
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    _ => {}
                }
            }
        }
    }
}

fn frame_json(frame: &LogFrame) -> String {
    let value = match frame {
        LogFrame::Log(content) => json!({ "type": "log", "content": content }),
        LogFrame::Info(message) => json!({ "type": "info", "message": message }),
        LogFrame::Error(message) => json!({ "type": "error", "message": message }),
        LogFrame::End { status } => json!({
            "type": "end",
            "status": status.to_string(),
            "message": "task finished",
        }),
    };
    value.to_string()
}

/// WS /ws/status
pub async fn status(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_status(socket, state))
}

async fn stream_status(mut socket: WebSocket, state: AppState) {
    let mut last_sent = serde_json::Value::Null;
    loop {
        let snapshot = status_snapshot(&state);
        if snapshot != last_sent {
            let payload = json!({ "type": "status_update", "data": snapshot }).to_string();
            if socket.send(Message::Text(payload.into())).await.is_err() {
                return;
            }
            last_sent = snapshot;
        }

        tokio::select! {
            _ = tokio::time::sleep(STATUS_INTERVAL) => {}
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    _ => {}
                }
            }
        }
    }
}

/// Delta unit for `/ws/status`: pending and running tasks of the primary
/// queue plus the global device picture.
fn status_snapshot(state: &AppState) -> serde_json::Value {
    let busy_gpus: Vec<u32> = state.workspace.busy_devices().keys().copied().collect();
    match state.workspace.primary_queue() {
        Some(queue) => {
            let tasks = queue.tasks();
            let pending: Vec<_> = tasks
                .iter()
                .filter(|t| t.status == tf_core::TaskStatus::Pending)
                .collect();
            let running: Vec<_> = tasks
                .iter()
                .filter(|t| t.status == tf_core::TaskStatus::Running)
                .collect();
            json!({
                "pending": pending,
                "running": running,
                "history_count": queue.history_count(),
                "busy_gpus": busy_gpus,
            })
        }
        None => json!({
            "pending": [],
            "running": [],
            "history_count": 0,
            "busy_gpus": busy_gpus,
        }),
    }
}
