//! Cross-queue device exclusivity: a device integer is held by at most
//! one running task system-wide; conflicts name the devices and holder.

use crate::prelude::*;
use std::time::Duration;
use tf_core::TaskStatus;
use tf_engine::EngineError;

#[tokio::test]
async fn conflicting_start_fails_then_succeeds_after_release() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_a = write_yaml(
        dir.path(),
        "a.yaml",
        "- name: t\n  command: \"CUDA_VISIBLE_DEVICES=0 sleep 5\"\n",
    );
    let yaml_b = write_yaml(
        dir.path(),
        "b.yaml",
        "- name: u\n  command: \"CUDA_VISIBLE_DEVICES=0,1 echo ok\"\n",
    );

    let ws = open_workspace(dir.path());
    let qa = ws.queue(&ws.add_queue("A", &yaml_a).unwrap().id).unwrap();
    let qb = ws.queue(&ws.add_queue("B", &yaml_b).unwrap().id).unwrap();

    let t = task_named(&qa, "t");
    let u = task_named(&qb, "u");

    qa.start_task(&t.id).unwrap();

    // busy_gpus equals the devices of running tasks system-wide.
    assert_eq!(
        ws.busy_devices().into_iter().collect::<Vec<_>>(),
        vec![(0, "A".to_string())]
    );

    // U needs 0 and 1; the error names device 0 and queue A.
    let err = qb.start_task(&u.id).unwrap_err();
    match err {
        EngineError::DeviceConflict {
            devices,
            holder,
            summary,
        } => {
            assert_eq!(devices, vec![0]);
            assert_eq!(holder, "A");
            assert!(summary.contains('0') && summary.contains('A'));
        }
        other => panic!("expected DeviceConflict, got {other:?}"),
    }
    assert_eq!(qb.get_task(&u.id).unwrap().status, TaskStatus::Pending);

    // Once T finishes, the same start succeeds and takes both devices.
    qa.stop_task(&t.id).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || qa
            .get_task(&t.id)
            .map(|t| t.status.is_terminal())
            .unwrap_or(false))
        .await
    );

    qb.start_task(&u.id).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || qb
            .get_task(&u.id)
            .map(|t| t.status == TaskStatus::Completed)
            .unwrap_or(false))
        .await
    );
    assert!(ws.busy_devices().is_empty());
}

#[tokio::test]
async fn tasks_without_devices_run_concurrently_across_queues() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_a = write_yaml(dir.path(), "a.yaml", "- name: a\n  command: \"sleep 1\"\n");
    let yaml_b = write_yaml(dir.path(), "b.yaml", "- name: b\n  command: \"sleep 1\"\n");

    let ws = open_workspace(dir.path());
    let qa = ws.queue(&ws.add_queue("A", &yaml_a).unwrap().id).unwrap();
    let qb = ws.queue(&ws.add_queue("B", &yaml_b).unwrap().id).unwrap();

    // Parallel across queues: both start immediately.
    qa.start_task(&task_named(&qa, "a").id).unwrap();
    qb.start_task(&task_named(&qb, "b").id).unwrap();

    assert!(qa.has_running());
    assert!(qb.has_running());

    let both_done = wait_until(Duration::from_secs(10), || {
        !qa.has_running() && !qb.has_running()
    })
    .await;
    assert!(both_done);
}
