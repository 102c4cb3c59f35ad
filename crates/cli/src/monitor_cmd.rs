// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taskflow monitor`: watch an external PID and notify on exit.
//!
//! For processes taskflow did not start (a colleague's training run, a
//! shell-launched job): poll until the pid is gone, then send the same
//! completion notification a supervised task would get.

use crate::color::{codes, paint};
use std::time::Duration;
use tf_core::format_elapsed;
use tf_engine::{env_notifier_factory, supervisor};

const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub async fn run(pid: u32, name: Option<String>, silent: bool) -> anyhow::Result<()> {
    if !supervisor::pid_alive(pid) {
        anyhow::bail!("process {pid} is not running");
    }
    let name = name.unwrap_or_else(|| format!("pid {pid}"));
    let started = std::time::Instant::now();
    println!(
        "{} {} (pid {pid})",
        paint(codes::HEADER, "Monitoring"),
        name
    );

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        if !supervisor::pid_alive(pid) {
            break;
        }
    }

    let elapsed = format_elapsed(started.elapsed().as_secs());
    println!(
        "{} {} exited after {elapsed} of monitoring",
        paint(codes::OK, "Done:"),
        name
    );

    if silent {
        return Ok(());
    }
    let factory = env_notifier_factory(std::env::current_dir()?);
    let Some(adapter) = factory() else {
        tracing::debug!("no push token configured, skipping notification");
        return Ok(());
    };
    let message = tf_notify::task_message(
        &name,
        tf_core::TaskStatus::Completed,
        Some(started.elapsed().as_secs() as i64),
        None,
        "(external process, no log captured)",
    );
    if let Err(e) = adapter.notify(&message.title, &message.content).await {
        tracing::warn!(error = %e, "notification failed");
    }
    Ok(())
}
