//! Forced stop: SIGTERM, a bounded grace, SIGKILL; the task reads as
//! stopped either way, with devices released and history written.

use crate::prelude::*;
use std::time::{Duration, Instant};
use tf_core::TaskStatus;

#[tokio::test]
async fn stop_lands_within_four_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: t\n  command: \"CUDA_VISIBLE_DEVICES=1 sleep 60\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("A", &yaml).unwrap().id).unwrap();
    let t = task_named(&queue, "t");

    queue.start_task(&t.id).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let stop_at = Instant::now();
    queue.stop_task(&t.id).unwrap();
    let stopped = wait_until(Duration::from_secs(4), || {
        queue.get_task(&t.id).map(|t| t.status) == Some(TaskStatus::Stopped)
    })
    .await;

    assert!(stopped, "task must be stopped within the grace window");
    assert!(stop_at.elapsed() < Duration::from_secs(4));

    // Exactly one history record; devices free again.
    let history = queue.history_recent(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TaskStatus::Stopped);
    assert!(ws.busy_devices().is_empty());
}

#[tokio::test]
async fn sigterm_ignoring_child_is_killed_after_grace() {
    let dir = tempfile::tempdir().unwrap();
    // The trap makes SIGTERM a no-op, forcing the SIGKILL escalation.
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: stubborn\n  command: \"trap '' TERM; sleep 60\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("A", &yaml).unwrap().id).unwrap();
    let t = task_named(&queue, "stubborn");

    queue.start_task(&t.id).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stop_at = Instant::now();
    queue.stop_task(&t.id).unwrap();

    let stopped = wait_until(Duration::from_secs(6), || {
        queue.get_task(&t.id).map(|t| t.status) == Some(TaskStatus::Stopped)
    })
    .await;
    assert!(stopped, "SIGKILL must finish the job after the grace");

    // Not before the grace, not much after it.
    let elapsed = stop_at.elapsed();
    assert!(elapsed >= Duration::from_millis(2900), "elapsed: {elapsed:?}");
    assert_eq!(
        queue.get_task(&t.id).unwrap().status,
        TaskStatus::Stopped,
        "explicit stop wins over the signal exit code"
    );
}

#[tokio::test]
async fn stopping_a_terminal_task_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(dir.path(), "tasks.yaml", "- name: quick\n  command: \"echo hi\"\n");

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("A", &yaml).unwrap().id).unwrap();
    let t = task_named(&queue, "quick");

    queue.start_task(&t.id).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || queue
            .get_task(&t.id)
            .map(|t| t.status.is_terminal())
            .unwrap_or(false))
        .await
    );
    assert!(queue.stop_task(&t.id).is_err());
}
