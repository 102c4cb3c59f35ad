//! Cross-session state: the manifest and the history round-trip through
//! their files, and a reopened workspace resumes where it left off.

use crate::prelude::*;
use std::time::Duration;
use tf_core::TaskStatus;
use tf_storage::{HistoryStore, Manifest};

#[tokio::test]
async fn manifest_round_trips_queue_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_a = write_yaml(dir.path(), "a.yaml", "- name: a\n  command: \"echo a\"\n");
    let yaml_b = write_yaml(dir.path(), "b.yaml", "- name: b\n  command: \"echo b\"\n");

    let (id_a, id_b) = {
        let ws = open_workspace(dir.path());
        let id_a = ws.add_queue("first", &yaml_a).unwrap().id;
        let id_b = ws.add_queue("second", &yaml_b).unwrap().id;
        (id_a, id_b)
    };

    // The persisted document alone carries everything needed to resume.
    let manifest = Manifest::load(dir.path()).unwrap();
    assert_eq!(manifest.version, "1.0");
    let ids: Vec<_> = manifest.queues.iter().map(|q| q.id.clone()).collect();
    assert_eq!(ids, vec![id_a.clone(), id_b.clone()]);

    let ws = open_workspace(dir.path());
    let listed = ws.list_queues();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "first");
    assert_eq!(listed[1].name, "second");
    assert!(ws.queue(&id_a).is_some());
    assert!(ws.queue(&id_b).is_some());
}

#[tokio::test]
async fn history_survives_reopen_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: r1\n  command: \"echo 1\"\n- name: r2\n  command: \"exit 1\"\n",
    );

    {
        let ws = open_workspace(dir.path());
        let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();
        queue.start_auto();
        let drained = wait_until(Duration::from_secs(10), || {
            queue.tasks().iter().all(|t| t.status.is_terminal())
        })
        .await;
        assert!(drained);
    }

    // Raw file round-trip.
    let store = HistoryStore::load(dir.path().join("logs/.history.json")).unwrap();
    let names: Vec<&str> = store.records().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["r1", "r2"]);
    assert_eq!(store.records()[0].status, TaskStatus::Completed);
    assert_eq!(store.records()[1].status, TaskStatus::Failed);
    assert_eq!(store.records()[1].exit_code, Some(1));

    // A reopened workspace sees the same history through the queue, and
    // refuses to re-load the finished names.
    let ws = open_workspace(dir.path());
    let queue = ws.primary_queue().unwrap();
    assert_eq!(queue.history_count(), 2);
    assert!(queue.tasks().is_empty(), "finished names stay retired");
}

#[tokio::test]
async fn retry_after_restart_via_fresh_start() {
    // The workspace does not resume in-flight work; a fresh run of a
    // pending task after reopen gets fresh timing and a fresh log.
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(dir.path(), "tasks.yaml", "- name: again\n  command: \"echo run\"\n");

    {
        let ws = open_workspace(dir.path());
        ws.add_queue("q", &yaml).unwrap();
        // No run in the first session.
    }

    let ws = open_workspace(dir.path());
    let queue = ws.primary_queue().unwrap();
    let task = task_named(&queue, "again");
    assert_eq!(task.status, TaskStatus::Pending);

    queue.start_task(&task.id).unwrap();
    let done = wait_until(Duration::from_secs(5), || {
        queue.get_task(&task.id).map(|t| t.status) == Some(TaskStatus::Completed)
    })
    .await;
    assert!(done);
}
