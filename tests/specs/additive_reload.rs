//! Live YAML re-ingestion: later loads are additive by name, duplicates
//! are reported, and nothing mutates on a structural error.

use crate::prelude::*;
use tf_core::TaskStatus;

#[tokio::test]
async fn editing_the_file_appends_only_the_new_task() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: A\n  command: \"echo a\"\n- name: B\n  command: \"echo b\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();

    // Edit the file: [A, B, C, A].
    std::fs::write(
        &yaml,
        "- name: A\n  command: \"echo a\"\n- name: B\n  command: \"echo b\"\n- name: C\n  command: \"echo c\"\n- name: A\n  command: \"echo dup\"\n",
    )
    .unwrap();

    let outcome = queue.load_new_tasks().unwrap();
    assert_eq!(outcome.loaded, 1);
    assert_eq!(outcome.rejected.len(), 1, "the duplicate A is rejected");
    assert!(outcome.rejected[0].contains("A"));

    let names: Vec<String> = queue.tasks().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn additive_load_law_holds_across_two_loads() {
    // After the second load, the name set equals first-load names plus
    // the second file's new names.
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: one\n  command: \"echo 1\"\n- name: two\n  command: \"echo 2\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();

    std::fs::write(
        &yaml,
        "- name: two\n  command: \"echo 2\"\n- name: three\n  command: \"echo 3\"\n",
    )
    .unwrap();
    queue.load_new_tasks().unwrap();

    let mut names: Vec<String> = queue.tasks().into_iter().map(|t| t.name).collect();
    names.sort();
    assert_eq!(names, vec!["one", "three", "two"]);
}

#[tokio::test]
async fn check_yaml_previews_without_applying() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(dir.path(), "tasks.yaml", "- name: a\n  command: \"echo a\"\n");

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();

    std::fs::write(
        &yaml,
        "- name: a\n  command: \"echo a\"\n- name: b\n  command: \"echo b\"\n- name: broken\n",
    )
    .unwrap();

    let report = queue.check_updates().unwrap();
    assert_eq!(report.total_in_yaml, 3);
    assert_eq!(report.new_tasks.len(), 2);
    assert!(report.new_tasks[0].valid);
    assert!(!report.new_tasks[1].valid, "entry without a command is invalid");

    assert_eq!(queue.tasks().len(), 1, "check is non-mutating");
}

#[tokio::test]
async fn names_already_in_history_never_reload() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(dir.path(), "tasks.yaml", "- name: a\n  command: \"echo a\"\n");

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();
    let a = task_named(&queue, "a");

    queue.start_task(&a.id).unwrap();
    assert!(
        wait_until(std::time::Duration::from_secs(5), || queue
            .get_task(&a.id)
            .map(|t| t.status == TaskStatus::Completed)
            .unwrap_or(false))
        .await
    );

    // Same name again, via reload after the run reached history.
    queue.reload().unwrap();
    assert!(queue.tasks().is_empty());

    let report = queue.check_updates().unwrap();
    assert!(report.new_tasks.is_empty(), "history names are not new");
}
