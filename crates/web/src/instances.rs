// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend instance registry.
//!
//! Each running backend writes a small JSON record under
//! `~/.taskflow/instances/<pid>.json` and removes it on clean shutdown.
//! `taskflow status` lists the records, probing each pid and pruning the
//! ones whose process is gone (crashes leave stale files behind).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub pid: u32,
    pub port: u16,
    pub workspace: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl InstanceRecord {
    pub fn current(port: u16, workspace: &Path) -> Self {
        Self {
            pid: std::process::id(),
            port,
            workspace: workspace.to_path_buf(),
            started_at: Utc::now(),
        }
    }

    /// Uptime in whole seconds.
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

/// `~/.taskflow/instances`
pub fn default_registry_dir() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(".taskflow").join("instances")
}

fn record_path(dir: &Path, pid: u32) -> PathBuf {
    dir.join(format!("{pid}.json"))
}

pub fn register(dir: &Path, record: &InstanceRecord) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let body = serde_json::to_string_pretty(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(record_path(dir, record.pid), body)
}

pub fn unregister(dir: &Path, pid: u32) -> std::io::Result<()> {
    match std::fs::remove_file(record_path(dir, pid)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Live instances, oldest first. Records whose process no longer exists
/// are pruned as a side effect.
pub fn list_live(dir: &Path) -> std::io::Result<Vec<InstanceRecord>> {
    let mut records = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(record) = serde_json::from_str::<InstanceRecord>(&text) else {
            tracing::warn!(path = %path.display(), "unreadable instance record, removing");
            let _ = std::fs::remove_file(&path);
            continue;
        };
        if tf_engine::supervisor::pid_alive(record.pid) {
            records.push(record);
        } else {
            tracing::debug!(pid = record.pid, "pruning dead instance record");
            let _ = std::fs::remove_file(&path);
        }
    }

    records.sort_by_key(|r| r.started_at);
    Ok(records)
}

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;
