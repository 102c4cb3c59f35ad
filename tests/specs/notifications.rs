//! Notification pipeline: exactly one message per terminal run, failures
//! never block the queue, and the backoff policy stays inside the send window.

use crate::prelude::*;
use std::time::Duration;
use tf_core::TaskStatus;
use tf_notify::FakeNotifier;

#[tokio::test]
async fn each_terminal_run_notifies_once() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: good\n  command: \"echo fine\"\n- name: bad\n  command: \"exit 2\"\n",
    );

    let fake = FakeNotifier::new();
    let ws = tf_engine::Workspace::open_with(dir.path(), Some(fake_notifier(&fake))).unwrap();
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();
    queue.start_auto();

    let drained = wait_until(Duration::from_secs(10), || {
        queue.tasks().iter().all(|t| t.status.is_terminal())
    })
    .await;
    assert!(drained);

    let notified = wait_until(Duration::from_secs(3), || fake.call_count() == 2).await;
    assert!(notified, "one notification per terminal transition");

    let calls = fake.calls();
    assert!(calls.iter().any(|c| c.title.contains("good") && c.title.contains("✅")));
    assert!(calls.iter().any(|c| c.title.contains("bad") && c.title.contains("❌")));
}

#[tokio::test]
async fn failing_notifier_does_not_stall_auto_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: one\n  command: \"echo 1\"\n- name: two\n  command: \"echo 2\"\n",
    );

    let fake = FakeNotifier::new();
    fake.fail_next(100);
    let ws = tf_engine::Workspace::open_with(dir.path(), Some(fake_notifier(&fake))).unwrap();
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();
    queue.start_auto();

    let drained = wait_until(Duration::from_secs(10), || {
        queue
            .tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Completed)
    })
    .await;
    assert!(drained, "queue completion is independent of notifications");
}

#[tokio::test]
async fn canceled_tasks_are_not_pushed() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(dir.path(), "tasks.yaml", "- name: never\n  command: \"echo x\"\n");

    let fake = FakeNotifier::new();
    let ws = tf_engine::Workspace::open_with(dir.path(), Some(fake_notifier(&fake))).unwrap();
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();

    queue.cancel_pending();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fake.call_count(), 0);
}
