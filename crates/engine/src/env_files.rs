// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `.env` file discovery and parsing.
//!
//! Notification settings (`MSG_PUSH_TOKEN`, `MTF_SILENT_MODE`) can live in
//! a dotenv-style file next to the configuration, in the working
//! directory, or in an ancestor of it. Lookups read the file fresh so a
//! runtime edit applies to the next task.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Parse dotenv content string into key-value pairs.
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(eq_pos) = trimmed.find('=') {
            let key = trimmed[..eq_pos].trim().to_string();
            let value = trimmed[eq_pos + 1..].trim().to_string();
            if !key.is_empty() {
                map.insert(key, value);
            }
        }
    }
    map
}

/// Parse a dotenv-style file into ordered key-value pairs.
/// Returns an empty map if the file doesn't exist.
pub fn read_env_file(path: &Path) -> std::io::Result<BTreeMap<String, String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e),
    };
    Ok(parse_env(&content))
}

/// Find the nearest `.env` file.
///
/// Precedence: the configuration directory, then the current working
/// directory, then its ancestors (nearest first).
pub fn discover_env_file(config_dir: &Path) -> Option<PathBuf> {
    let candidate = config_dir.join(".env");
    if candidate.is_file() {
        return Some(candidate);
    }

    let cwd = std::env::current_dir().ok()?;
    for dir in cwd.ancestors() {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Resolve `key`: the process environment wins, then the discovered
/// `.env` file (read fresh on every call).
pub fn lookup(config_dir: &Path, key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(key) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    let path = discover_env_file(config_dir)?;
    read_env_file(&path).ok()?.remove(key)
}

/// Load the discovered `.env` into the process environment at startup.
/// Existing variables are never overridden.
pub fn load_into_process(config_dir: &Path) -> Option<PathBuf> {
    let path = discover_env_file(config_dir)?;
    let vars = read_env_file(&path).ok()?;
    for (key, value) in vars {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, &value);
        }
    }
    Some(path)
}

#[cfg(test)]
#[path = "env_files_tests.rs"]
mod tests;
