// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process supervision.
//!
//! Each task runs as `sh -c <command>` in its own process group, with
//! stdout and stderr pointed at the task's log file. Writes go straight
//! from the child to the file, so every write boundary is on disk without
//! a copy loop in between. Termination is cooperative first (SIGTERM to
//! the group), forceful after a grace period (SIGKILL).

use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Grace between the polite termination request and the forceful kill.
pub const STOP_GRACE: Duration = Duration::from_millis(3000);

/// A spawned task child. Held by the queue that started it; dropped once
/// the child has been reaped.
pub struct RunningChild {
    pid: u32,
    child: Child,
}

impl RunningChild {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wait for the child to exit and map its status to an exit code.
    ///
    /// A signal-terminated child reports `128 + signo`, matching shell
    /// convention.
    pub async fn wait(mut self) -> std::io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(exit_code_of(status))
    }
}

/// Spawn `command` through the shell with its output appended to
/// `log_path`.
///
/// The log file (and its parent directory) is created before the child
/// starts, so subscribers always have a file to tail once the task is
/// running. `env` entries are injected into the child only; the
/// supervisor's own environment is never touched.
pub fn spawn(
    command: &str,
    cwd: &Path,
    env: &[(String, String)],
    log_path: &Path,
) -> std::io::Result<RunningChild> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let log_file_err = log_file.try_clone()?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_file_err))
        .current_dir(cwd)
        .kill_on_drop(false);
    #[cfg(unix)]
    cmd.process_group(0);

    for (key, value) in env {
        cmd.env(key, value);
    }

    let child = cmd.spawn()?;
    let pid = child.id().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "child exited before observation")
    })?;

    tracing::info!(pid, command, log = %log_path.display(), "task child spawned");
    Ok(RunningChild { pid, child })
}

/// Cooperative termination request: SIGTERM to the child's process group.
#[cfg(unix)]
pub fn terminate_group(pid: u32) {
    send_group_signal(pid, libc::SIGTERM);
}

/// Forceful kill: SIGKILL to the child's process group.
#[cfg(unix)]
pub fn kill_group(pid: u32) {
    send_group_signal(pid, libc::SIGKILL);
}

#[cfg(not(unix))]
pub fn terminate_group(pid: u32) {
    send_group_signal(pid, 0);
}

#[cfg(not(unix))]
pub fn kill_group(pid: u32) {
    send_group_signal(pid, 0);
}

#[cfg(unix)]
fn send_group_signal(pid: u32, signum: libc::c_int) {
    // SAFETY: kill(2) is safe to call with any pid and a valid signal
    // number. Negative pid addresses the whole process group.
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), signum) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: the group is already gone, which is fine.
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, signum, error = %err, "failed to signal process group");
        }
    }
}

#[cfg(not(unix))]
fn send_group_signal(_pid: u32, _signum: i32) {
    tracing::warn!("process-group signalling is only supported on unix");
}

/// True when `pid` refers to a live process (signal 0 probe).
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    // SAFETY: signal 0 performs only the existence check.
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    ret == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}

#[cfg(not(unix))]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
