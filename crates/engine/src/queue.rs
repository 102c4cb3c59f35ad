// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One task queue: ordered execution over a single configuration file.
//!
//! The queue owns its tasks, its loaded-name set, and its history. All
//! mutation happens under one internal lock; child waits, grace timers,
//! and notification sends run on their own tokio tasks, off the lock.
//! Cross-queue coordination goes exclusively through the shared
//! [`DeviceLedger`].

use crate::devices::{DeviceHolder, DeviceLedger};
use crate::{log_paths, supervisor, EngineError};
use chrono::Local;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tf_config::{DiffReport, TaskEntry};
use tf_core::{HistoryRecord, IdGen, PrefixedHexIdGen, QueueId, Task, TaskId, TaskStatus};
use tf_notify::NotifyAdapter;
use tf_storage::HistoryStore;
use tokio::sync::Notify;

/// Resolves the notification adapter at send time.
///
/// Returning `None` skips the send (no token configured, or silent mode
/// read from a `.env` file). Resolution happens per terminal transition
/// so runtime settings changes apply to the next task.
pub type NotifierFactory = Arc<dyn Fn() -> Option<Arc<dyn NotifyAdapter>> + Send + Sync>;

/// Fallback cadence of the auto-dispatcher when no wake arrives.
const DISPATCH_TICK: Duration = Duration::from_secs(1);

/// Summary of a load operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadOutcome {
    pub loaded: usize,
    pub skipped: usize,
    /// Display-ready per-name rejection messages.
    pub rejected: Vec<String>,
}

/// Point-in-time counters for the REST and WS layers.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub auto_running: bool,
    pub pending_count: usize,
    pub running_count: usize,
    pub history_count: usize,
}

struct RunningHandle {
    task_id: TaskId,
    pid: u32,
    stop_requested: bool,
}

#[derive(Default)]
struct QueueState {
    /// Insertion order is queue order.
    tasks: IndexMap<TaskId, Task>,
    loaded_names: HashSet<String>,
    auto_running: bool,
    running: Option<RunningHandle>,
}

pub struct TaskQueue {
    id: QueueId,
    name: String,
    yaml_path: PathBuf,
    ledger: Arc<DeviceLedger>,
    notifier: NotifierFactory,
    id_gen: PrefixedHexIdGen,
    state: Mutex<QueueState>,
    history: Mutex<HistoryStore>,
    dispatch: Notify,
    dispatcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TaskQueue {
    /// Open a queue over its configuration file.
    ///
    /// Loads the history file eagerly; the task list is populated by
    /// [`TaskQueue::load_initial`].
    pub fn open(
        id: QueueId,
        name: impl Into<String>,
        yaml_path: PathBuf,
        ledger: Arc<DeviceLedger>,
        notifier: NotifierFactory,
    ) -> Result<Arc<Self>, EngineError> {
        let history = HistoryStore::load(log_paths::history_path(&yaml_path))?;
        Ok(Arc::new(Self {
            id,
            name: name.into(),
            yaml_path,
            ledger,
            notifier,
            id_gen: PrefixedHexIdGen::new("task"),
            state: Mutex::new(QueueState::default()),
            history: Mutex::new(history),
            dispatch: Notify::new(),
            dispatcher: Mutex::new(None),
        }))
    }

    pub fn id(&self) -> &QueueId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn yaml_path(&self) -> &Path {
        &self.yaml_path
    }

    fn config_dir(&self) -> PathBuf {
        self.yaml_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    }

    // ---- configuration ingestion ------------------------------------

    /// First load: fully populate the queue, minus `skipped` entries.
    ///
    /// Structural errors abort without mutating anything. Duplicate names
    /// (within the file, or against history) are rejected per-name while
    /// the rest of the batch loads.
    pub fn load_initial(&self) -> Result<LoadOutcome, EngineError> {
        let entries = tf_config::parse_file(&self.yaml_path)?;
        tf_config::validate_all(&entries)?;

        let mut state = self.state.lock();
        let outcome = self.ingest(&mut state, entries);
        drop(state);

        self.dispatch.notify_one();
        Ok(outcome)
    }

    /// Additive load: append tasks whose name is not yet known (live,
    /// loading batch, or history). Invalid entries are reported, not
    /// inserted.
    pub fn load_new_tasks(&self) -> Result<LoadOutcome, EngineError> {
        let entries = tf_config::parse_file(&self.yaml_path)?;

        let mut state = self.state.lock();
        let known = self.known_names(&state);
        let report = tf_config::diff_new_entries(&entries, &known);

        let mut outcome = LoadOutcome::default();
        for new in report.new_tasks {
            if !new.valid {
                let label = if new.entry.name.is_empty() {
                    "(unnamed)"
                } else {
                    new.entry.name.as_str()
                };
                let reason = new.reason.unwrap_or_else(|| "invalid entry".to_string());
                outcome.rejected.push(format!("{label}: {reason}"));
                continue;
            }
            if new.entry.is_skipped() {
                outcome.skipped += 1;
                continue;
            }
            self.insert_entry(&mut state, &new.entry);
            outcome.loaded += 1;
        }
        drop(state);

        self.dispatch.notify_one();
        Ok(outcome)
    }

    /// Non-mutating preview of what an additive load would append.
    pub fn check_updates(&self) -> Result<DiffReport, EngineError> {
        let entries = tf_config::parse_file(&self.yaml_path)?;
        let state = self.state.lock();
        let known = self.known_names(&state);
        drop(state);
        Ok(tf_config::diff_new_entries(&entries, &known))
    }

    /// Load a user-picked subset of entries (same duplicate rules as an
    /// additive load).
    pub fn load_selected(&self, selected: Vec<TaskEntry>) -> Result<LoadOutcome, EngineError> {
        let mut state = self.state.lock();
        let known = self.known_names(&state);
        let report = tf_config::diff_new_entries(&selected, &known);

        let mut outcome = LoadOutcome::default();
        for new in report.new_tasks {
            if !new.valid {
                let label = if new.entry.name.is_empty() {
                    "(unnamed)"
                } else {
                    new.entry.name.as_str()
                };
                let reason = new.reason.unwrap_or_else(|| "invalid entry".to_string());
                outcome.rejected.push(format!("{label}: {reason}"));
                continue;
            }
            self.insert_entry(&mut state, &new.entry);
            outcome.loaded += 1;
        }
        // Entries already known were filtered out of the report entirely;
        // surface them as skipped duplicates.
        outcome.skipped = selected
            .iter()
            .filter(|e| !e.name.is_empty() && known.contains(&e.name))
            .count();
        drop(state);

        self.dispatch.notify_one();
        Ok(outcome)
    }

    /// Full reload: drop the live task list and re-ingest the file.
    /// Refused while a task is running. History is kept.
    pub fn reload(&self) -> Result<LoadOutcome, EngineError> {
        let entries = tf_config::parse_file(&self.yaml_path)?;
        tf_config::validate_all(&entries)?;

        let mut state = self.state.lock();
        if state.running.is_some() {
            return Err(EngineError::ReloadWhileRunning);
        }
        state.tasks.clear();
        state.loaded_names.clear();
        let outcome = self.ingest(&mut state, entries);
        drop(state);

        self.dispatch.notify_one();
        Ok(outcome)
    }

    /// Names the duplicate check must span: live tasks, loaded names, and
    /// everything in history.
    fn known_names(&self, state: &QueueState) -> HashSet<String> {
        let mut known: HashSet<String> = state.loaded_names.clone();
        known.extend(state.tasks.values().map(|t| t.name.clone()));
        known.extend(self.history.lock().names().map(String::from));
        known
    }

    fn ingest(&self, state: &mut QueueState, entries: Vec<TaskEntry>) -> LoadOutcome {
        let known = self.known_names(state);
        let mut outcome = LoadOutcome::default();
        let mut batch: HashSet<String> = HashSet::new();

        for entry in entries {
            if entry.is_skipped() {
                outcome.skipped += 1;
                continue;
            }
            if known.contains(&entry.name) || batch.contains(&entry.name) {
                outcome
                    .rejected
                    .push(format!("{}: task already exists (queue or history)", entry.name));
                continue;
            }
            batch.insert(entry.name.clone());
            self.insert_entry(state, &entry);
            outcome.loaded += 1;
        }
        outcome
    }

    fn insert_entry(&self, state: &mut QueueState, entry: &TaskEntry) {
        let task = Task::new(
            TaskId::new(self.id_gen.next()),
            &entry.name,
            &entry.command,
            entry.note.clone(),
            entry.env.clone(),
        );
        tracing::info!(queue = %self.id, task = %task.id, name = %task.name, "task loaded");
        state.loaded_names.insert(entry.name.clone());
        state.tasks.insert(task.id.clone(), task);
    }

    // ---- execution ---------------------------------------------------

    /// Start a pending task now.
    ///
    /// Device reservation and the pending→running transition form one
    /// critical section under the queue lock; a conflict surfaces as a
    /// precondition failure naming the devices and their holder.
    pub fn start_task(self: &Arc<Self>, task_id: &TaskId) -> Result<Task, EngineError> {
        let mut state = self.state.lock();

        if let Some(running) = &state.running {
            let name = state
                .tasks
                .get(&running.task_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| running.task_id.to_string());
            return Err(EngineError::QueueBusy { name });
        }

        let (devices, task_name, command, env) = {
            let task = state
                .tasks
                .get(task_id)
                .ok_or_else(|| EngineError::TaskNotFound(task_id.clone()))?;
            if task.status != TaskStatus::Pending {
                return Err(EngineError::NotPending {
                    name: task.name.clone(),
                    status: task.status,
                });
            }
            let env: Vec<(String, String)> = task
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (task.devices.clone(), task.name.clone(), task.command.clone(), env)
        };

        self.ledger.try_reserve(
            &devices,
            DeviceHolder {
                queue_id: self.id.clone(),
                queue_name: self.name.clone(),
                task_id: task_id.clone(),
                task_name: task_name.clone(),
            },
        )?;

        let log_path = log_paths::task_log_path(&self.yaml_path, &task_name, Local::now());

        match supervisor::spawn(&command, &self.config_dir(), &env, &log_path) {
            Ok(child) => {
                let pid = child.pid();
                let snapshot = {
                    let Some(task) = state.tasks.get_mut(task_id) else {
                        return Err(EngineError::TaskNotFound(task_id.clone()));
                    };
                    task.begin(log_path);
                    task.clone()
                };
                state.running = Some(RunningHandle {
                    task_id: task_id.clone(),
                    pid,
                    stop_requested: false,
                });
                drop(state);

                tracing::info!(queue = %self.id, task = %task_id, pid, name = %task_name, "task started");
                let queue = Arc::clone(self);
                let task_id = task_id.clone();
                tokio::spawn(async move {
                    // The child wait happens off the queue lock.
                    let result = child.wait().await;
                    queue.on_child_exit(&task_id, result);
                });
                Ok(snapshot)
            }
            Err(e) => {
                let snapshot = {
                    let Some(task) = state.tasks.get_mut(task_id) else {
                        return Err(EngineError::TaskNotFound(task_id.clone()));
                    };
                    task.begin(log_path);
                    task.complete(-1, Some(format!("spawn failed: {e}")));
                    task.clone()
                };
                drop(state);

                tracing::error!(queue = %self.id, task = %task_id, error = %e, "spawn failed");
                self.ledger.release_task(task_id);
                self.record_terminal(&snapshot);
                self.dispatch.notify_one();
                Err(EngineError::Spawn(e.to_string()))
            }
        }
    }

    /// Request termination of a running task. Returns immediately; the
    /// child waiter records the terminal state once the process is gone.
    pub fn stop_task(self: &Arc<Self>, task_id: &TaskId) -> Result<(), EngineError> {
        let pid = {
            let mut state = self.state.lock();
            let task = state
                .tasks
                .get(task_id)
                .ok_or_else(|| EngineError::TaskNotFound(task_id.clone()))?;
            if task.status != TaskStatus::Running {
                return Err(EngineError::NotRunning {
                    name: task.name.clone(),
                    status: task.status,
                });
            }
            let task_name = task.name.clone();
            let task_status = task.status;
            let Some(running) = state.running.as_mut().filter(|r| &r.task_id == task_id) else {
                return Err(EngineError::NotRunning {
                    name: task_name,
                    status: task_status,
                });
            };
            running.stop_requested = true;
            running.pid
        };

        tracing::info!(queue = %self.id, task = %task_id, pid, "stop requested, sending SIGTERM");
        supervisor::terminate_group(pid);

        // Escalate to SIGKILL if the same run is still alive after grace.
        let queue = Arc::clone(self);
        let task_id = task_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(supervisor::STOP_GRACE).await;
            let still_running = {
                let state = queue.state.lock();
                state
                    .running
                    .as_ref()
                    .map(|r| r.task_id == task_id && r.pid == pid)
                    .unwrap_or(false)
            };
            if still_running {
                tracing::warn!(task = %task_id, pid, "grace expired, sending SIGKILL");
                supervisor::kill_group(pid);
            }
        });
        Ok(())
    }

    /// Stop whatever is running, if anything. Used by stop-all, queue
    /// removal, and shutdown.
    pub fn stop_running(self: &Arc<Self>) -> Option<TaskId> {
        let task_id = {
            let state = self.state.lock();
            state.running.as_ref().map(|r| r.task_id.clone())
        }?;
        match self.stop_task(&task_id) {
            Ok(()) => Some(task_id),
            Err(_) => None,
        }
    }

    /// Reset a terminal task (other than canceled) to pending at the tail
    /// of the queue. The next run gets fresh timing and a fresh log file.
    pub fn retry(&self, task_id: &TaskId) -> Result<Task, EngineError> {
        let snapshot = {
            let mut state = self.state.lock();
            let task = state
                .tasks
                .get_mut(task_id)
                .ok_or_else(|| EngineError::TaskNotFound(task_id.clone()))?;
            if !task.status.is_terminal() || task.status == TaskStatus::Canceled {
                return Err(EngineError::NotRetryable {
                    name: task.name.clone(),
                    status: task.status,
                });
            }
            task.reset_for_retry();
            let snapshot = task.clone();
            if let Some(task) = state.tasks.shift_remove(task_id) {
                state.tasks.insert(task_id.clone(), task);
            }
            snapshot
        };
        self.dispatch.notify_one();
        Ok(snapshot)
    }

    /// Cancel every pending task (graceful shutdown). Each cancellation
    /// is a terminal transition and lands in history.
    pub fn cancel_pending(&self) -> Vec<Task> {
        let snapshots: Vec<Task> = {
            let mut state = self.state.lock();
            state
                .tasks
                .values_mut()
                .filter(|t| t.status == TaskStatus::Pending)
                .map(|t| {
                    t.cancel();
                    t.clone()
                })
                .collect()
        };
        for task in &snapshots {
            self.record_terminal(task);
        }
        snapshots
    }

    // ---- auto mode ---------------------------------------------------

    pub fn start_auto(&self) {
        self.state.lock().auto_running = true;
        tracing::info!(queue = %self.id, "auto mode on");
        self.dispatch.notify_one();
    }

    /// Turn auto mode off. Does not interrupt a running task; only
    /// prevents further dispatches.
    pub fn stop_auto(&self) {
        self.state.lock().auto_running = false;
        tracing::info!(queue = %self.id, "auto mode off");
    }

    pub fn auto_running(&self) -> bool {
        self.state.lock().auto_running
    }

    /// Spawn the dispatcher task. Idempotent per queue lifetime; the
    /// workspace calls this once when the queue is attached.
    pub fn start_dispatcher(self: &Arc<Self>) {
        let mut slot = self.dispatcher.lock();
        if slot.is_some() {
            return;
        }
        let queue = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            loop {
                queue.dispatch_next();
                tokio::select! {
                    _ = queue.dispatch.notified() => {}
                    _ = queue.ledger.wait_released() => {}
                    _ = tokio::time::sleep(DISPATCH_TICK) => {}
                }
            }
        }));
    }

    /// Abort the dispatcher task. Running children are unaffected.
    pub fn stop_dispatcher(&self) {
        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
    }

    /// One dispatch evaluation: if auto is on and nothing is running,
    /// start the first pending task. A device conflict means wait (the
    /// ledger wakes us on release); a spawn failure means move on.
    fn dispatch_next(self: &Arc<Self>) {
        loop {
            let candidate = {
                let state = self.state.lock();
                if !state.auto_running || state.running.is_some() {
                    return;
                }
                state
                    .tasks
                    .iter()
                    .find(|(_, t)| t.status == TaskStatus::Pending)
                    .map(|(id, _)| id.clone())
            };
            let Some(task_id) = candidate else { return };

            match self.start_task(&task_id) {
                Ok(_) => return,
                Err(EngineError::DeviceConflict { summary, .. }) => {
                    tracing::debug!(queue = %self.id, task = %task_id, %summary, "auto-dispatch waiting for devices");
                    return;
                }
                Err(e) => {
                    tracing::warn!(queue = %self.id, task = %task_id, error = %e, "auto-dispatch start failed");
                    continue;
                }
            }
        }
    }

    // ---- terminal pipeline -------------------------------------------

    fn on_child_exit(&self, task_id: &TaskId, wait_result: std::io::Result<i32>) {
        let snapshot = {
            let mut state = self.state.lock();
            let stop_requested = state
                .running
                .as_ref()
                .map(|r| &r.task_id == task_id && r.stop_requested)
                .unwrap_or(false);
            if state.running.as_ref().map(|r| &r.task_id) == Some(task_id) {
                state.running = None;
            }
            let Some(task) = state.tasks.get_mut(task_id) else {
                return;
            };
            if stop_requested {
                task.mark_stopped(wait_result.as_ref().ok().copied());
            } else {
                match wait_result {
                    Ok(code) => task.complete(code, None),
                    Err(e) => task.complete(-1, Some(format!("wait failed: {e}"))),
                }
            }
            tracing::info!(
                queue = %self.id,
                task = %task_id,
                status = %task.status,
                exit_code = ?task.exit_code,
                "task finished"
            );
            task.clone()
        };

        // Ordering contract: device release precedes the history append,
        // which precedes the next auto-dispatch.
        self.ledger.release_task(task_id);
        self.record_terminal(&snapshot);
        self.dispatch.notify_one();
    }

    fn record_terminal(&self, task: &Task) {
        let record = HistoryRecord::from_task(task);
        if let Err(e) = self.history.lock().append(record) {
            tracing::error!(
                queue = %self.id,
                task = %task.id,
                error = %e,
                "failed to persist history; in-memory state remains authoritative"
            );
        }
        self.send_notification(task);
    }

    fn send_notification(&self, task: &Task) {
        // Cancelled-before-running tasks never notify; nothing ran.
        if !matches!(
            task.status,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Stopped
        ) {
            return;
        }
        let factory = Arc::clone(&self.notifier);
        let task = task.clone();
        tokio::spawn(async move {
            let Some(adapter) = factory() else {
                tracing::debug!(task = %task.id, "no notifier configured, skipping");
                return;
            };
            let tail = match &task.log_path {
                Some(path) => match tokio::fs::read(path).await {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(_) => String::new(),
                },
                None => String::new(),
            };
            let message = tf_notify::task_message(
                &task.name,
                task.status,
                task.duration_secs(),
                task.error_message.as_deref(),
                &tail,
            );
            if let Err(e) = adapter.notify(&message.title, &message.content).await {
                tracing::warn!(task = %task.id, error = %e, "notification failed");
            }
        });
    }

    // ---- views -------------------------------------------------------

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.values().cloned().collect()
    }

    pub fn get_task(&self, task_id: &TaskId) -> Option<Task> {
        self.state.lock().tasks.get(task_id).cloned()
    }

    pub fn running_task(&self) -> Option<Task> {
        let state = self.state.lock();
        let running = state.running.as_ref()?;
        state.tasks.get(&running.task_id).cloned()
    }

    pub fn has_running(&self) -> bool {
        self.state.lock().running.is_some()
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.state.lock();
        QueueStatus {
            auto_running: state.auto_running,
            pending_count: state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Pending)
                .count(),
            running_count: usize::from(state.running.is_some()),
            history_count: self.history.lock().len(),
        }
    }

    pub fn history_recent(&self, limit: usize) -> Vec<HistoryRecord> {
        self.history.lock().recent(limit)
    }

    pub fn history_count(&self) -> usize {
        self.history.lock().len()
    }

    pub fn find_history(&self, task_id: &TaskId) -> Option<HistoryRecord> {
        self.history.lock().find(task_id).cloned()
    }

    /// Poll until no task is running, up to `timeout`. True when idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.has_running() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        true
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
