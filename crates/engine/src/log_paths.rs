// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared path builders for task log files.
//!
//! Used by both the supervisor (writer) and the tailer/REST readers to
//! construct consistent paths in the per-config directory structure:
//!   `<config_dir>/logs/<task_name>_<timestamp>.log`

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Directory holding log files and the history document for one queue.
///
/// `config_path` is the queue's YAML file; logs live next to it.
pub fn logs_dir(config_path: &Path) -> PathBuf {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join("logs")
}

/// Path of the queue's history file: `<config_dir>/logs/.history.json`.
pub fn history_path(config_path: &Path) -> PathBuf {
    logs_dir(config_path).join(".history.json")
}

/// Build the log path for one task run.
///
/// Structure: `{config_dir}/logs/{sanitised_name}_{YYYYMMDD_HHMMSS}.log`.
/// Each run gets a fresh file; a retry never appends to an old log.
pub fn task_log_path(config_path: &Path, task_name: &str, now: DateTime<Local>) -> PathBuf {
    let stamp = now.format("%Y%m%d_%H%M%S");
    logs_dir(config_path).join(format!("{}_{}.log", sanitise_name(task_name), stamp))
}

/// Replace path-hostile characters so any task name yields a usable file
/// name.
pub fn sanitise_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "log_paths_tests.rs"]
mod tests;
