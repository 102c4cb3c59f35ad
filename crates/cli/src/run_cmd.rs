// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreground single-queue runner.
//!
//! Loads one configuration file, turns auto mode on, and blocks until
//! every task is terminal. SIGINT prompts for five seconds: detach
//! (default, children keep running under the OS parent) or terminate.

use crate::color::{codes, paint};
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tf_core::{format_elapsed, IdGen, PrefixedHexIdGen, QueueId, TaskStatus};
use tf_engine::{env_files, env_notifier_factory, DeviceLedger, TaskQueue};
use tokio::io::{AsyncBufReadExt, BufReader};

/// How long the interrupt prompt waits before detaching.
const PROMPT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(config: PathBuf) -> anyhow::Result<()> {
    let config = std::fs::canonicalize(&config)
        .with_context(|| format!("configuration file not found: {}", config.display()))?;
    let config_dir = config
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    if let Some(env_path) = env_files::load_into_process(&config_dir) {
        tracing::info!(path = %env_path.display(), "loaded .env");
    }

    let queue = TaskQueue::open(
        QueueId::new(PrefixedHexIdGen::new("queue").next()),
        config
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks".to_string()),
        config.clone(),
        Arc::new(DeviceLedger::new()),
        env_notifier_factory(config_dir),
    )?;

    let outcome = queue.load_initial()?;
    println!(
        "{} {} task(s) from {}",
        paint(codes::HEADER, "Loaded"),
        outcome.loaded,
        config.display()
    );
    for rejected in &outcome.rejected {
        println!("  {} {rejected}", paint(codes::WARN, "rejected:"));
    }
    if outcome.loaded == 0 {
        println!("nothing to run");
        return Ok(());
    }

    queue.start_dispatcher();
    queue.start_auto();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                let all_terminal = queue
                    .tasks()
                    .iter()
                    .all(|t| t.status.is_terminal());
                if all_terminal && !queue.has_running() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle_interrupt(&queue).await;
                break;
            }
        }
    }

    print_summary(&queue);
    Ok(())
}

async fn handle_interrupt(queue: &Arc<TaskQueue>) {
    println!();
    println!("{}", paint(codes::WARN, "Interrupt received."));

    queue.stop_auto();
    let canceled = queue.cancel_pending();
    if !canceled.is_empty() {
        println!("  canceled {} pending task(s)", canceled.len());
    }

    let Some(running) = queue.running_task() else {
        return;
    };

    print!(
        "  terminate running task {}? [y/N] (detaching in {}s): ",
        running.name,
        PROMPT_TIMEOUT.as_secs()
    );
    let _ = std::io::stdout().flush();

    let answer = tokio::time::timeout(PROMPT_TIMEOUT, async {
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        reader.read_line(&mut line).await.map(|_| line)
    })
    .await;

    let kill = matches!(&answer, Ok(Ok(line)) if line.trim().eq_ignore_ascii_case("y"));
    if kill {
        if queue.stop_running().is_some() {
            queue.wait_idle(Duration::from_secs(5)).await;
        }
        println!("  terminated");
    } else {
        println!();
        println!(
            "  detached; {} keeps running (log: {})",
            running.name,
            running
                .log_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_summary(queue: &Arc<TaskQueue>) {
    let tasks = queue.tasks();
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

    println!();
    println!("{}", paint(codes::HEADER, "Run report"));
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        paint(codes::OK, "completed:"),
        count(TaskStatus::Completed),
        paint(codes::FAIL, "failed:"),
        count(TaskStatus::Failed),
        paint(codes::WARN, "stopped:"),
        count(TaskStatus::Stopped),
        paint(codes::MUTED, "canceled:"),
        count(TaskStatus::Canceled),
    );

    for task in tasks.iter().filter(|t| t.status == TaskStatus::Failed) {
        println!(
            "  {} {} (exit {}{})",
            paint(codes::FAIL, "✗"),
            task.name,
            task.exit_code.unwrap_or(-1),
            task.duration_secs()
                .map(|d| format!(", {}", format_elapsed(d.max(0) as u64)))
                .unwrap_or_default(),
        );
        if let Some(error) = &task.error_message {
            println!("      {}", paint(codes::MUTED, error));
        }
        if let Some(log) = &task.log_path {
            println!("      {}", paint(codes::MUTED, &log.display().to_string()));
        }
    }
}
