// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded append-only history of terminal task outcomes.

use crate::atomic::{rotate_bak_path, write_json};
use crate::StorageError;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tf_core::{HistoryRecord, TaskId};
use tracing::warn;

/// Default cap on retained records per queue.
pub const DEFAULT_HISTORY_CAP: usize = 500;

/// Read-mostly store of frozen task snapshots for one queue.
///
/// Records are held newest-last. The on-disk file mirrors memory after
/// every append; a write failure is surfaced to the caller, who logs it
/// and carries on — memory stays authoritative and the next append
/// rewrites the whole document.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    cap: usize,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Load the history file at `path`, or start empty when it is missing.
    /// A corrupt file is rotated to `.bak` like the manifest.
    pub fn load(path: PathBuf) -> Result<Self, StorageError> {
        let records = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            match serde_json::from_reader(reader) {
                Ok(records) => records,
                Err(e) => {
                    let bak_path = rotate_bak_path(&path);
                    warn!(
                        error = %e,
                        path = %path.display(),
                        bak = %bak_path.display(),
                        "Corrupt history file, moving to .bak and starting fresh",
                    );
                    fs::rename(&path, &bak_path)?;
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            cap: DEFAULT_HISTORY_CAP,
            records,
        })
    }

    /// Override the retention cap (tests use small values).
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Append a record, evict above the cap, persist.
    pub fn append(&mut self, record: HistoryRecord) -> Result<(), StorageError> {
        self.records.push(record);
        if self.records.len() > self.cap {
            let excess = self.records.len() - self.cap;
            self.records.drain(..excess);
        }
        write_json(&self.path, &self.records)
    }

    /// Newest-last view of all retained records.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Up to `limit` most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &TaskId) -> Option<&HistoryRecord> {
        // Search newest-first so a retried id resolves to its latest run.
        self.records.iter().rev().find(|r| &r.id == id)
    }

    /// All names that ever reached a terminal state here. Used by the
    /// queue's duplicate-name check on reloads.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
