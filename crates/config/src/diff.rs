// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! New-task diffing against the live queue.

use crate::TaskEntry;
use serde::Serialize;
use std::collections::HashSet;

/// A prospective task found in configuration but not yet loaded.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    #[serde(flatten)]
    pub entry: TaskEntry,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of comparing a parsed configuration against known task names.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    /// Entries present in the file, new or not.
    pub total_in_yaml: usize,
    /// Entries whose name is not already known, in file order.
    pub new_tasks: Vec<NewTask>,
}

/// Compute which entries would be appended by an additive load.
///
/// `known_names` must span live tasks and history (the caller assembles
/// it under its lock). Pure: no queue state is touched, so a reload can be
/// previewed and then applied, or abandoned, without side effects.
pub fn diff_new_entries(entries: &[TaskEntry], known_names: &HashSet<String>) -> DiffReport {
    let mut new_tasks = Vec::new();
    let mut seen_in_file: HashSet<&str> = HashSet::new();

    for entry in entries {
        // A name repeated within the file is always reported, even when
        // its first occurrence is an existing task.
        let repeat = !entry.name.is_empty() && !seen_in_file.insert(entry.name.as_str());
        if repeat {
            new_tasks.push(NewTask {
                entry: entry.clone(),
                valid: false,
                reason: Some(format!("duplicate name in file: {}", entry.name)),
            });
            continue;
        }
        // First occurrence of an already-known name: not new, not noise.
        if !entry.name.is_empty() && known_names.contains(&entry.name) {
            continue;
        }
        let (valid, reason) = match entry.validate() {
            Ok(()) => (true, None),
            Err(message) => (false, Some(message)),
        };
        new_tasks.push(NewTask {
            entry: entry.clone(),
            valid,
            reason,
        });
    }

    DiffReport {
        total_in_yaml: entries.len(),
        new_tasks,
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
