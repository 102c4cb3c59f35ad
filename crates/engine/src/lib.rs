// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency, resource-coordination, and supervision engine.
//!
//! The pieces, leaves first: the [`supervisor`] runs one child process
//! and its log file; a [`TaskQueue`] runs tasks strictly in order over
//! one configuration file; the [`Workspace`] coordinates queues through
//! the global [`DeviceLedger`] and persists the manifest; a [`LogTailer`]
//! fans a growing log file out to live subscribers.

mod devices;
mod error;
pub mod env_files;
pub mod log_paths;
mod queue;
pub mod supervisor;
mod tailer;
#[cfg(test)]
mod test_helpers;
mod workspace;

pub use devices::{DeviceHolder, DeviceLedger};
pub use error::EngineError;
pub use queue::{LoadOutcome, NotifierFactory, QueueStatus, TaskQueue};
pub use tailer::{LogFrame, LogTailer, FILE_WAIT, POLL_INTERVAL, SUBSCRIBER_BUFFER};
pub use workspace::{
    env_notifier_factory, FoundTask, QueueOverview, Workspace, SHUTDOWN_GRACE,
};
