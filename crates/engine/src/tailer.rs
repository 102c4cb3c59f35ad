// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live log fan-out.
//!
//! A tailer follows one task's log file while the child appends to it:
//! backlog first, then newly appended bytes on a bounded poll, then
//! exactly one `End` frame once the task has left `running` and the tail
//! is drained. Each subscriber gets its own tailer; ordering is
//! per-subscriber monotonic because there is a single reader per stream.

use crate::workspace::{FoundTask, Workspace};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tf_core::{TaskId, TaskStatus};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;

/// How often the tailer re-checks the file for growth.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long to wait for the log file to appear after `running`.
pub const FILE_WAIT: Duration = Duration::from_secs(30);

/// Frames buffered per subscriber before the producer blocks. The
/// transport layer disconnects subscribers that stay behind.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// One frame of the live log protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum LogFrame {
    /// Bytes appended to the log (backlog or live tail).
    Log(String),
    Info(String),
    Error(String),
    /// Terminal frame; no frame follows it.
    End { status: TaskStatus },
}

pub struct LogTailer {
    workspace: Arc<Workspace>,
    task_id: TaskId,
    poll_interval: Duration,
    file_wait: Duration,
}

impl LogTailer {
    pub fn new(workspace: Arc<Workspace>, task_id: TaskId) -> Self {
        Self {
            workspace,
            task_id,
            poll_interval: POLL_INTERVAL,
            file_wait: FILE_WAIT,
        }
    }

    /// Shrink the timings (tests).
    pub fn with_timing(mut self, poll_interval: Duration, file_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.file_wait = file_wait;
        self
    }

    /// Spawn the stream onto the runtime and hand back the receiving end.
    pub fn subscribe(self) -> mpsc::Receiver<LogFrame> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        tokio::spawn(self.stream(tx));
        rx
    }

    fn current(&self) -> Option<(TaskStatus, Option<PathBuf>)> {
        match self.workspace.find_task(&self.task_id)? {
            FoundTask::Live { task, .. } => Some((task.status, task.log_path)),
            FoundTask::Historical { record, .. } => Some((record.status, record.log_path)),
        }
    }

    /// Produce the frame stream into `tx`. Returns when the terminal
    /// frame is sent or the subscriber goes away.
    pub async fn stream(self, tx: mpsc::Sender<LogFrame>) {
        macro_rules! send {
            ($frame:expr) => {
                if tx.send($frame).await.is_err() {
                    return;
                }
            };
        }

        let Some((_, log_path)) = self.current() else {
            send!(LogFrame::Error("task not found".to_string()));
            return;
        };

        // Wait for the log file if the task has not produced one yet.
        let path = match log_path.filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                send!(LogFrame::Info("waiting for log file...".to_string()));
                let deadline = tokio::time::Instant::now() + self.file_wait;
                loop {
                    tokio::time::sleep(self.poll_interval).await;
                    match self.current() {
                        None => {
                            send!(LogFrame::Error("task not found".to_string()));
                            return;
                        }
                        Some((_, Some(path))) if path.exists() => break path,
                        Some(_) => {}
                    }
                    if tokio::time::Instant::now() >= deadline {
                        send!(LogFrame::Error("log file was not created".to_string()));
                        return;
                    }
                }
            }
        };

        // Backlog: everything written before this subscriber joined.
        let mut pos = 0u64;
        if let Ok((bytes, new_pos)) = read_from(&path, pos).await {
            if !bytes.is_empty() {
                send!(LogFrame::Log(String::from_utf8_lossy(&bytes).into_owned()));
            }
            pos = new_pos;
        }

        loop {
            let Some((status, _)) = self.current() else {
                send!(LogFrame::Error("task no longer exists".to_string()));
                return;
            };

            if status != TaskStatus::Running {
                // Drain whatever landed after the last poll, then close.
                if let Ok((bytes, _)) = read_from(&path, pos).await {
                    if !bytes.is_empty() {
                        send!(LogFrame::Log(String::from_utf8_lossy(&bytes).into_owned()));
                    }
                }
                send!(LogFrame::End { status });
                return;
            }

            if let Ok((bytes, new_pos)) = read_from(&path, pos).await {
                if !bytes.is_empty() {
                    send!(LogFrame::Log(String::from_utf8_lossy(&bytes).into_owned()));
                }
                pos = new_pos;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

async fn read_from(path: &Path, pos: u64) -> std::io::Result<(Vec<u8>, u64)> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(SeekFrom::Start(pos)).await?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;
    let new_pos = pos + buf.len() as u64;
    Ok((buf, new_pos))
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
