//! Sequential auto-run: a queue in auto mode drains its pending tasks in
//! order, one at a time, recording history and log files for each.

use crate::prelude::*;
use std::time::Duration;
use tf_core::TaskStatus;

#[tokio::test]
async fn auto_mode_runs_both_tasks_to_completion_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: t1\n  command: \"echo a\"\n- name: t2\n  command: \"echo b\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("A", &yaml).unwrap().id).unwrap();
    queue.start_auto();

    let done = wait_until(Duration::from_secs(10), || {
        queue
            .tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Completed)
    })
    .await;
    assert!(done, "both tasks should complete");

    // History holds T1 then T2, in that order.
    let history = queue.history_recent(10);
    let names: Vec<&str> = history.iter().rev().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["t1", "t2"]);

    // Log files exist under logs/ with matching contents.
    let logs_dir = dir.path().join("logs");
    assert!(logs_dir.is_dir());
    for (name, expected) in [("t1", "a\n"), ("t2", "b\n")] {
        let task = task_named(&queue, name);
        let log_path = task.log_path.unwrap();
        assert!(log_path.starts_with(&logs_dir));
        assert_eq!(std::fs::read_to_string(log_path).unwrap(), expected);
    }

    // Timing invariant: every terminated task has ended_at >= started_at.
    for task in queue.tasks() {
        assert!(task.ended_at.unwrap() >= task.started_at.unwrap());
    }
}

#[tokio::test]
async fn at_most_one_task_runs_at_any_moment() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: a\n  command: \"sleep 0.4\"\n- name: b\n  command: \"sleep 0.4\"\n- name: c\n  command: \"sleep 0.4\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("A", &yaml).unwrap().id).unwrap();
    queue.start_auto();

    // Sample the running count while the queue drains.
    let mut max_running = 0;
    for _ in 0..150 {
        let running = queue
            .tasks()
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .count();
        max_running = max_running.max(running);
        if queue.tasks().iter().all(|t| t.status.is_terminal()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(max_running, 1, "queue must be strictly sequential");
    assert!(queue
        .tasks()
        .iter()
        .all(|t| t.status == TaskStatus::Completed));
}
