//! Shared fixtures for the behavioural specs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tf_core::Task;
use tf_engine::{NotifierFactory, TaskQueue, Workspace};
use tf_notify::{FakeNotifier, NotifyAdapter};

pub fn no_notifier() -> NotifierFactory {
    Arc::new(|| None)
}

pub fn fake_notifier(fake: &FakeNotifier) -> NotifierFactory {
    let fake = fake.clone();
    Arc::new(move || Some(Arc::new(fake.clone()) as Arc<dyn NotifyAdapter>))
}

pub fn write_yaml(dir: &Path, file_name: &str, body: &str) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, body).unwrap();
    path
}

pub fn open_workspace(dir: &Path) -> Arc<Workspace> {
    Workspace::open_with(dir, Some(no_notifier())).unwrap()
}

pub fn task_named(queue: &Arc<TaskQueue>, name: &str) -> Task {
    queue
        .tasks()
        .into_iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| panic!("no task named {name}"))
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
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
