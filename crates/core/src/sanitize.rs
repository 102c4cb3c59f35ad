// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log sanitisation for non-live readers.
//!
//! Training scripts redraw progress bars with bare carriage returns; a log
//! file replayed over REST would otherwise show thousands of intermediate
//! redraws. Live WebSocket subscribers get raw bytes and are unaffected.

/// Collapse carriage-return progress redraws into one line per terminal
/// update.
///
/// Within each `\n`-terminated line, only the last non-empty `\r` fragment
/// survives; fragments that are pure `\r` padding are discarded.
pub fn collapse_progress_lines(content: &str) -> String {
    let mut out = Vec::new();
    for line in content.split('\n') {
        if line.contains('\r') {
            let kept = line
                .rsplit('\r')
                .find(|frag| !frag.trim().is_empty())
                .unwrap_or("");
            out.push(kept);
        } else {
            out.push(line);
        }
    }
    out.join("\n")
}

/// Last `n` lines of `content`, joined with `\n`.
pub fn last_n_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
