// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity and state machine.

use crate::device::parse_devices;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a task instance (`task_<hex8>`).
    ///
    /// Assigned when the task is read out of configuration and stable for
    /// the life of the process; history records carry it across restarts.
    #[derive(Default)]
    pub struct TaskId;
}

/// Status of a task.
///
/// `Skipped` never enters a queue: it marks configuration entries that are
/// read but deliberately excluded. The other variants follow the lifecycle
/// `pending → running → {completed, failed, stopped}`, with `canceled`
/// reserved for pending tasks discarded at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
    Skipped,
    Canceled,
}

impl TaskStatus {
    /// A terminal task never transitions again except via explicit retry.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Stopped | TaskStatus::Canceled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // These strings are part of the wire contract; do not change them.
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Stopped => write!(f, "stopped"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// One external command tracked end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Literal shell-interpreted command string.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Devices this task occupies while running. Parsed from the command
    /// once at creation and never re-derived.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<u32>,
    /// Per-task environment overrides, injected into the child only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Task {
    /// Create a pending task. Devices are taken from the command string
    /// (`CUDA_VISIBLE_DEVICES=...`) unless `devices` is given explicitly.
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        command: impl Into<String>,
        note: Option<String>,
        env: BTreeMap<String, String>,
    ) -> Self {
        let command = command.into();
        let devices = parse_devices(&command);
        Self {
            id,
            name: name.into(),
            command,
            note,
            devices,
            env,
            status: TaskStatus::Pending,
            started_at: None,
            ended_at: None,
            exit_code: None,
            error_message: None,
            log_path: None,
        }
    }

    /// Override the parsed device list (used when configuration names
    /// devices explicitly).
    pub fn with_devices(mut self, devices: Vec<u32>) -> Self {
        self.devices = devices;
        self
    }

    /// Transition `pending → running`, stamping the start time and log path.
    pub fn begin(&mut self, log_path: PathBuf) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        self.ended_at = None;
        self.exit_code = None;
        self.error_message = None;
        self.log_path = Some(log_path);
    }

    /// Terminal transition from a child exit: code 0 completes, anything
    /// else fails. `error_message` is kept for spawn failures.
    pub fn complete(&mut self, exit_code: i32, error_message: Option<String>) {
        self.ended_at = Some(Utc::now());
        self.exit_code = Some(exit_code);
        self.error_message = error_message;
        self.status = if exit_code == 0 {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
    }

    /// Terminal transition for an explicit stop request. Wins over the
    /// signal-induced exit code.
    pub fn mark_stopped(&mut self, exit_code: Option<i32>) {
        self.ended_at = Some(Utc::now());
        self.exit_code = exit_code;
        self.status = TaskStatus::Stopped;
    }

    /// `pending → canceled` at shutdown.
    pub fn cancel(&mut self) {
        self.status = TaskStatus::Canceled;
    }

    /// Clear run artefacts and return to `pending` for a fresh run.
    pub fn reset_for_retry(&mut self) {
        self.status = TaskStatus::Pending;
        self.started_at = None;
        self.ended_at = None;
        self.exit_code = None;
        self.error_message = None;
        self.log_path = None;
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock duration, available once both timestamps are set.
    pub fn duration_secs(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
