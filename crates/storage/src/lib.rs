// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for the workspace manifest and per-queue task history.
//!
//! Both documents are small JSON files written atomically (temp file,
//! fsync, rename) so that readers never observe a half-written state.
//! The in-memory state is always authoritative; a failed write is logged
//! and reconciled by the next successful one.

mod atomic;
mod history;
mod manifest;

pub use history::HistoryStore;
pub use manifest::{Manifest, QueueEntry, MANIFEST_FILE_NAME};

use thiserror::Error;

/// Errors that can occur in persistence operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
