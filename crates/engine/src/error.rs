// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use std::path::PathBuf;
use tf_core::{QueueId, TaskId, TaskStatus};
use thiserror::Error;

/// Errors that can occur in the engine.
///
/// Every variant renders a message suitable for direct display; the REST
/// layer forwards them verbatim.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("queue not found: {0}")]
    QueueNotFound(QueueId),

    #[error("task {name} is not pending (status: {status})")]
    NotPending { name: String, status: TaskStatus },

    #[error("task {name} is not running (status: {status})")]
    NotRunning { name: String, status: TaskStatus },

    #[error("task {name} cannot be retried (status: {status})")]
    NotRetryable { name: String, status: TaskStatus },

    #[error("a task is already running in this queue: {name}")]
    QueueBusy { name: String },

    #[error("device conflict: {summary}")]
    DeviceConflict {
        summary: String,
        devices: Vec<u32>,
        holder: String,
    },

    #[error("configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("queue already registered for {}", .0.display())]
    DuplicateQueue(PathBuf),

    #[error("a task is running; stop it before reloading")]
    ReloadWhileRunning,

    #[error("failed to start task: {0}")]
    Spawn(String),

    #[error(transparent)]
    Config(#[from] tf_config::ParseError),

    #[error(transparent)]
    Storage(#[from] tf_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
