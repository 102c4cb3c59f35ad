//! Live log fan-out: every subscriber converges on the final file
//! contents by its `end` frame, whatever its join point.

use crate::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tf_engine::{LogFrame, LogTailer};
use tokio::sync::mpsc::Receiver;

async fn drain(mut rx: Receiver<LogFrame>) -> Vec<LogFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    frames
}

fn bytes_of(frames: &[LogFrame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            LogFrame::Log(chunk) => Some(chunk.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn early_and_late_subscribers_converge() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(
        dir.path(),
        "tasks.yaml",
        "- name: chatty\n  command: \"echo one; sleep 0.6; echo two; sleep 0.6; echo three\"\n",
    );

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();
    let task = task_named(&queue, "chatty");

    let fast = |t: LogTailer| t.with_timing(Duration::from_millis(25), Duration::from_secs(5));

    // S1 connects before the task starts.
    let rx1 = fast(LogTailer::new(Arc::clone(&ws), task.id.clone())).subscribe();
    queue.start_task(&task.id).unwrap();

    // S2 connects mid-run, after some output exists.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let rx2 = fast(LogTailer::new(Arc::clone(&ws), task.id.clone())).subscribe();

    let frames1 = drain(rx1).await;
    let frames2 = drain(rx2).await;

    let final_content =
        std::fs::read_to_string(queue.get_task(&task.id).unwrap().log_path.unwrap()).unwrap();
    assert_eq!(final_content, "one\ntwo\nthree\n");

    // Both subscribers saw exactly the file, in order, no byte twice.
    assert_eq!(bytes_of(&frames1), final_content);
    assert_eq!(bytes_of(&frames2), final_content);

    // Exactly one terminal frame each, last.
    for frames in [&frames1, &frames2] {
        let ends = frames
            .iter()
            .filter(|f| matches!(f, LogFrame::End { .. }))
            .count();
        assert_eq!(ends, 1);
        assert!(matches!(frames.last(), Some(LogFrame::End { .. })));
    }
}

#[tokio::test]
async fn subscriber_to_never_starting_task_gets_the_grace_error() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = write_yaml(dir.path(), "tasks.yaml", "- name: idle\n  command: \"echo x\"\n");

    let ws = open_workspace(dir.path());
    let queue = ws.queue(&ws.add_queue("q", &yaml).unwrap().id).unwrap();
    let task = task_named(&queue, "idle");

    let rx = LogTailer::new(ws, task.id)
        .with_timing(Duration::from_millis(25), Duration::from_millis(300))
        .subscribe();
    let frames = drain(rx).await;

    assert_eq!(
        frames,
        vec![
            LogFrame::Info("waiting for log file...".to_string()),
            LogFrame::Error("log file was not created".to_string()),
        ]
    );
}
