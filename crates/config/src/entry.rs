// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task configuration entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tf_core::TaskStatus;

/// One record of a task configuration file.
///
/// Fields are lenient at parse time so that a malformed entry can be
/// reported with a per-entry reason instead of aborting the whole file;
/// [`TaskEntry::validate`] enforces the required fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    /// Raw status string as written. Anything other than `"skipped"` is
    /// normalised to pending (compatibility with existing configs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl TaskEntry {
    /// Required-field check. Returns the display-ready reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("missing required field: name".to_string());
        }
        if self.command.trim().is_empty() {
            return Err("missing required field: command".to_string());
        }
        Ok(())
    }

    /// Entries marked `skipped` are read and reported but never enqueued.
    pub fn is_skipped(&self) -> bool {
        matches!(self.status.as_deref(), Some("skipped"))
    }

    /// Initial status for queue ingestion.
    pub fn initial_status(&self) -> TaskStatus {
        if self.is_skipped() {
            TaskStatus::Skipped
        } else {
            TaskStatus::Pending
        }
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
