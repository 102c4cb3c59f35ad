// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace manifest: which queues exist and workspace-scoped settings.
//!
//! The manifest is the only cross-session state the workspace owns. Queue
//! task lists live in their YAML files and histories; the manifest just
//! enumerates the queues so a restart can re-attach them.

use crate::atomic::{rotate_bak_path, write_json};
use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tf_core::QueueId;
use tracing::warn;

/// File name of the manifest inside the workspace directory.
pub const MANIFEST_FILE_NAME: &str = ".workspace.json";

const MANIFEST_VERSION: &str = "1.0";

/// One configured queue as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueId,
    pub name: String,
    /// Absolute path of the queue's task configuration file.
    pub yaml_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// The persisted workspace document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub queues: Vec<QueueEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushplus_token: Option<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            updated_at: Utc::now(),
            queues: Vec::new(),
            pushplus_token: None,
        }
    }
}

impl Manifest {
    /// Load the manifest from a workspace directory.
    ///
    /// A missing file yields an empty manifest. A corrupt file is moved to
    /// a `.bak` so the workspace can start fresh instead of refusing to
    /// boot.
    pub fn load(workspace_dir: &Path) -> Result<Self, StorageError> {
        let path = workspace_dir.join(MANIFEST_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                let bak_path = rotate_bak_path(&path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "Corrupt workspace manifest, moving to .bak and starting fresh",
                );
                fs::rename(&path, &bak_path)?;
                Ok(Self::default())
            }
        }
    }

    /// Save atomically into the workspace directory, stamping `updated_at`.
    pub fn save(&mut self, workspace_dir: &Path) -> Result<(), StorageError> {
        self.updated_at = Utc::now();
        let path = workspace_dir.join(MANIFEST_FILE_NAME);
        write_json(&path, self)
    }

    pub fn find_queue(&self, id: &QueueId) -> Option<&QueueEntry> {
        self.queues.iter().find(|q| &q.id == id)
    }

    /// True when some queue already points at this (resolved) config path.
    pub fn has_yaml_path(&self, yaml_path: &Path) -> bool {
        self.queues.iter().any(|q| q.yaml_path == yaml_path)
    }

    pub fn remove_queue(&mut self, id: &QueueId) -> Option<QueueEntry> {
        let idx = self.queues.iter().position(|q| &q.id == id)?;
        Some(self.queues.remove(idx))
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
