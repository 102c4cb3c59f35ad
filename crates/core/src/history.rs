// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frozen snapshots of terminal task outcomes.

use crate::task::{Task, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A task outcome at the moment it turned terminal.
///
/// Appended to a queue's history file and never mutated afterwards; the
/// live `Task` may be retried and overwritten, the record may not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: TaskId,
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl HistoryRecord {
    /// Freeze the task as it stands. Callers only do this on terminal
    /// transitions.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            command: task.command.clone(),
            note: task.note.clone(),
            status: task.status,
            started_at: task.started_at,
            ended_at: task.ended_at,
            duration_secs: task.duration_secs(),
            exit_code: task.exit_code,
            error_message: task.error_message.clone(),
            log_path: task.log_path.clone(),
        }
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
