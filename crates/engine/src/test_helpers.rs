// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::queue::{NotifierFactory, TaskQueue};
use crate::DeviceLedger;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tf_core::QueueId;
use tf_notify::{FakeNotifier, NotifyAdapter};

/// Factory that never produces an adapter (notifications disabled).
pub(crate) fn no_notifier() -> NotifierFactory {
    Arc::new(|| None)
}

/// Factory resolving to a shared fake adapter.
pub(crate) fn fake_notifier(fake: &FakeNotifier) -> NotifierFactory {
    let fake = fake.clone();
    Arc::new(move || Some(Arc::new(fake.clone()) as Arc<dyn NotifyAdapter>))
}

pub(crate) fn write_config(dir: &Path, file_name: &str, yaml: &str) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, yaml).unwrap();
    path
}

/// Open a queue over `yaml` with a fresh ledger and no notifier, and run
/// the initial load.
pub(crate) fn open_queue(yaml_path: PathBuf) -> Arc<TaskQueue> {
    open_queue_with(yaml_path, Arc::new(DeviceLedger::new()), no_notifier())
}

pub(crate) fn open_queue_with(
    yaml_path: PathBuf,
    ledger: Arc<DeviceLedger>,
    notifier: NotifierFactory,
) -> Arc<TaskQueue> {
    let queue = TaskQueue::open(
        QueueId::new("queue_test0001"),
        "test-queue",
        yaml_path,
        ledger,
        notifier,
    )
    .unwrap();
    queue.load_initial().unwrap();
    queue
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub(crate) async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
