// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device list extraction from command strings.

/// Parse the device list out of a `CUDA_VISIBLE_DEVICES=<list>` assignment
/// embedded in a shell command.
///
/// The first occurrence wins. The value may be bare (`0,1`), single- or
/// double-quoted, and may carry whitespace around the commas. Fragments
/// that are not non-negative integers are ignored; duplicates are dropped
/// while preserving first-seen order. Returns an empty vec when the token
/// is absent.
pub fn parse_devices(command: &str) -> Vec<u32> {
    const TOKEN: &str = "CUDA_VISIBLE_DEVICES=";

    let Some(pos) = command.find(TOKEN) else {
        return Vec::new();
    };
    let rest = &command[pos + TOKEN.len()..];

    // The assignment value ends at the first unquoted whitespace.
    let raw = match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => rest[1..].split(quote).next().unwrap_or(""),
        _ => rest.split_whitespace().next().unwrap_or(""),
    };

    let mut devices = Vec::new();
    for piece in raw.split(',') {
        if let Ok(d) = piece.trim().parse::<u32>() {
            if !devices.contains(&d) {
                devices.push(d);
            }
        }
    }
    devices
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
