// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML parsing for task configuration files.

use crate::TaskEntry;
use serde_yaml_ng::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while ingesting a configuration file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error at line {line}: {message}")]
    Yaml { line: usize, message: String },

    #[error("configuration root must be a task list (YAML sequence)")]
    NotASequence,

    #[error("task #{index}: {message}")]
    Entry { index: usize, message: String },
}

/// Parse a configuration string into task entries.
///
/// Structural errors (bad YAML, non-sequence root, an entry that is not a
/// mapping of the recognised shape) abort with a located message; no
/// partial result is returned.
pub fn parse_str(text: &str) -> Result<Vec<TaskEntry>, ParseError> {
    let value: Value = serde_yaml_ng::from_str(text).map_err(|e| ParseError::Yaml {
        line: e.location().map(|l| l.line()).unwrap_or(0),
        message: e.to_string(),
    })?;

    let Value::Sequence(items) = value else {
        return Err(ParseError::NotASequence);
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let entry: TaskEntry =
            serde_yaml_ng::from_value(item).map_err(|e| ParseError::Entry {
                index: index + 1,
                message: e.to_string(),
            })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Read and parse a configuration file.
pub fn parse_file(path: &Path) -> Result<Vec<TaskEntry>, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text)
}

/// Enforce required fields on every entry, aborting on the first failure.
///
/// Used for the initial queue load, where a broken entry means the file as
/// a whole is not trustworthy. Reload paths report per-entry validity via
/// [`crate::diff_new_entries`] instead.
pub fn validate_all(entries: &[TaskEntry]) -> Result<(), ParseError> {
    for (index, entry) in entries.iter().enumerate() {
        entry.validate().map_err(|message| ParseError::Entry {
            index: index + 1,
            message,
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
