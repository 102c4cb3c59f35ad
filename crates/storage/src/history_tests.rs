// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tf_core::TaskStatus;

fn record(id: &str, name: &str, status: TaskStatus) -> HistoryRecord {
    HistoryRecord {
        id: TaskId::new(id),
        name: name.to_string(),
        command: format!("echo {name}"),
        note: None,
        status,
        started_at: None,
        ended_at: None,
        duration_secs: None,
        exit_code: Some(0),
        error_message: None,
        log_path: None,
    }
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::load(dir.path().join(".history.json")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn append_persists_and_reloads_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/.history.json");

    let mut store = HistoryStore::load(path.clone()).unwrap();
    store.append(record("task_1", "a", TaskStatus::Completed)).unwrap();
    store.append(record("task_2", "b", TaskStatus::Failed)).unwrap();

    let back = HistoryStore::load(path).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back.records()[0].name, "a");
    assert_eq!(back.records()[1].name, "b");
}

#[test]
fn cap_evicts_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::load(dir.path().join(".history.json"))
        .unwrap()
        .with_cap(2);

    store.append(record("task_1", "a", TaskStatus::Completed)).unwrap();
    store.append(record("task_2", "b", TaskStatus::Completed)).unwrap();
    store.append(record("task_3", "c", TaskStatus::Completed)).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.records()[0].name, "b");
    assert_eq!(store.records()[1].name, "c");
}

#[test]
fn recent_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::load(dir.path().join(".history.json")).unwrap();
    store.append(record("task_1", "a", TaskStatus::Completed)).unwrap();
    store.append(record("task_2", "b", TaskStatus::Stopped)).unwrap();

    let recent = store.recent(10);
    assert_eq!(recent[0].name, "b");
    assert_eq!(recent[1].name, "a");

    assert_eq!(store.recent(1).len(), 1);
}

#[test]
fn find_prefers_latest_run_of_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::load(dir.path().join(".history.json")).unwrap();
    store.append(record("task_1", "a", TaskStatus::Failed)).unwrap();
    store.append(record("task_1", "a", TaskStatus::Completed)).unwrap();

    let found = store.find(&TaskId::new("task_1")).unwrap();
    assert_eq!(found.status, TaskStatus::Completed);
    assert!(store.find(&TaskId::new("task_9")).is_none());
}

#[test]
fn names_spans_all_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::load(dir.path().join(".history.json")).unwrap();
    store.append(record("task_1", "a", TaskStatus::Completed)).unwrap();
    store.append(record("task_2", "b", TaskStatus::Completed)).unwrap();

    let names: Vec<&str> = store.names().collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn corrupt_history_rotates_to_bak() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".history.json");
    std::fs::write(&path, "[{broken").unwrap();

    let store = HistoryStore::load(path.clone()).unwrap();
    assert!(store.is_empty());
    assert!(dir.path().join(".history.bak").exists());
}
