// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core domain types for taskflow: tasks, status machine, history
//! records, device parsing, and id generation.
//!
//! This crate has no I/O and no runtime dependencies; everything here is
//! plain data shared by the engine, storage, and web layers.

mod device;
mod history;
pub mod id;
mod sanitize;
mod task;
pub mod time_fmt;

pub use device::parse_devices;
pub use history::HistoryRecord;
pub use id::{IdGen, PrefixedHexIdGen, SequentialIdGen};
pub use sanitize::{collapse_progress_lines, last_n_lines};
pub use task::{Task, TaskId, TaskStatus};
pub use time_fmt::format_elapsed;

crate::define_id! {
    /// Unique identifier for a configured queue (`queue_<hex8>`).
    ///
    /// Generated when a queue is added to the workspace and persisted in
    /// the workspace manifest.
    #[derive(Default)]
    pub struct QueueId;
}
