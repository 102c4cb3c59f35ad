// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-queue coordinator.
//!
//! The workspace owns the manifest, the global device ledger, and the
//! notifier wiring. Queues are attached from the manifest at open and by
//! `add_queue` afterwards; each runs its own dispatcher and reaches the
//! rest of the system only through the shared ledger and notifier
//! factory, so there is no queue→workspace back-reference.

use crate::devices::DeviceLedger;
use crate::queue::{NotifierFactory, QueueStatus, TaskQueue};
use crate::{env_files, EngineError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tf_core::{HistoryRecord, IdGen, PrefixedHexIdGen, QueueId, Task, TaskId};
use tf_notify::{NotifyAdapter, PushPlusNotifier};
use tf_storage::{Manifest, QueueEntry};

/// Bounded wait for running children during shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A queue with its persisted descriptor and live counters.
#[derive(Debug, Clone, Serialize)]
pub struct QueueOverview {
    pub id: QueueId,
    pub name: String,
    pub yaml_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub status: QueueStatus,
}

/// Result of a cross-queue task lookup: live tasks first, then history.
#[derive(Debug, Clone)]
pub enum FoundTask {
    Live { queue_id: QueueId, task: Task },
    Historical { queue_id: QueueId, record: HistoryRecord },
}

struct WsState {
    queues: IndexMap<QueueId, Arc<TaskQueue>>,
    manifest: Manifest,
}

pub struct Workspace {
    dir: PathBuf,
    ledger: Arc<DeviceLedger>,
    id_gen: PrefixedHexIdGen,
    push_token: Arc<Mutex<Option<String>>>,
    notifier: NotifierFactory,
    state: Mutex<WsState>,
}

impl Workspace {
    /// Open (or create) the workspace at `dir` with the default PushPlus
    /// notifier wiring.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Arc<Self>, EngineError> {
        Self::open_with(dir, None)
    }

    /// Open with an injected notifier factory (tests, CLI silent runs).
    pub fn open_with(
        dir: impl Into<PathBuf>,
        notifier: Option<NotifierFactory>,
    ) -> Result<Arc<Self>, EngineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let manifest = Manifest::load(&dir)?;
        let push_token = Arc::new(Mutex::new(manifest.pushplus_token.clone()));
        let notifier = notifier
            .unwrap_or_else(|| default_notifier_factory(dir.clone(), Arc::clone(&push_token)));

        let workspace = Arc::new(Self {
            dir,
            ledger: Arc::new(DeviceLedger::new()),
            id_gen: PrefixedHexIdGen::new("queue"),
            push_token,
            notifier,
            state: Mutex::new(WsState {
                queues: IndexMap::new(),
                manifest,
            }),
        });

        // Re-attach queues from the manifest. Entries whose configuration
        // file is gone are logged and skipped, not dropped from the
        // manifest.
        let entries: Vec<QueueEntry> = workspace.state.lock().manifest.queues.clone();
        for entry in entries {
            if !entry.yaml_path.exists() {
                tracing::warn!(
                    queue = %entry.id,
                    path = %entry.yaml_path.display(),
                    "configuration file missing, skipping queue"
                );
                continue;
            }
            if let Err(e) = workspace.attach_queue(&entry) {
                tracing::error!(queue = %entry.id, error = %e, "failed to load queue");
            }
        }

        tracing::info!(dir = %workspace.dir.display(), queues = workspace.state.lock().queues.len(), "workspace open");
        Ok(workspace)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn attach_queue(self: &Arc<Self>, entry: &QueueEntry) -> Result<Arc<TaskQueue>, EngineError> {
        let queue = TaskQueue::open(
            entry.id.clone(),
            entry.name.clone(),
            entry.yaml_path.clone(),
            Arc::clone(&self.ledger),
            Arc::clone(&self.notifier),
        )?;
        let outcome = queue.load_initial()?;
        if !outcome.rejected.is_empty() {
            tracing::warn!(
                queue = %entry.id,
                rejected = ?outcome.rejected,
                "some configured tasks were rejected at load"
            );
        }
        queue.start_dispatcher();
        self.state
            .lock()
            .queues
            .insert(entry.id.clone(), Arc::clone(&queue));
        Ok(queue)
    }

    // ---- queue management --------------------------------------------

    /// Register a new queue over `yaml_path` and persist the manifest.
    /// The path is resolved absolute; a second queue on the same file is
    /// refused.
    pub fn add_queue(self: &Arc<Self>, name: &str, yaml_path: &Path) -> Result<QueueEntry, EngineError> {
        let yaml_path = std::fs::canonicalize(yaml_path)
            .map_err(|_| EngineError::ConfigMissing(yaml_path.to_path_buf()))?;

        if self.state.lock().manifest.has_yaml_path(&yaml_path) {
            return Err(EngineError::DuplicateQueue(yaml_path));
        }

        let entry = QueueEntry {
            id: QueueId::new(self.id_gen.next()),
            name: name.to_string(),
            yaml_path,
            created_at: Utc::now(),
        };
        self.attach_queue(&entry)?;

        let mut state = self.state.lock();
        state.manifest.queues.push(entry.clone());
        if let Err(e) = state.manifest.save(&self.dir) {
            tracing::error!(error = %e, "failed to persist manifest; in-memory state remains authoritative");
        }

        tracing::info!(queue = %entry.id, name = %entry.name, path = %entry.yaml_path.display(), "queue added");
        Ok(entry)
    }

    /// Detach a queue: auto off, running task stopped (forceful after
    /// grace), manifest persisted. The configuration file is never
    /// deleted.
    pub fn remove_queue(&self, id: &QueueId) -> Result<(), EngineError> {
        let queue = self
            .state
            .lock()
            .queues
            .shift_remove(id)
            .ok_or_else(|| EngineError::QueueNotFound(id.clone()))?;

        queue.stop_auto();
        queue.stop_dispatcher();
        queue.stop_running();

        let mut state = self.state.lock();
        state.manifest.remove_queue(id);
        if let Err(e) = state.manifest.save(&self.dir) {
            tracing::error!(error = %e, "failed to persist manifest; in-memory state remains authoritative");
        }

        tracing::info!(queue = %id, "queue removed");
        Ok(())
    }

    /// Reuse the queue registered on `yaml_path`, or register one named
    /// after the file. Single-configuration compatibility entry point.
    pub fn add_single_yaml(self: &Arc<Self>, yaml_path: &Path) -> Result<QueueId, EngineError> {
        let resolved = std::fs::canonicalize(yaml_path)
            .map_err(|_| EngineError::ConfigMissing(yaml_path.to_path_buf()))?;

        let existing = {
            let state = self.state.lock();
            state
                .manifest
                .queues
                .iter()
                .find(|q| q.yaml_path == resolved)
                .map(|q| q.id.clone())
        };
        if let Some(id) = existing {
            return Ok(id);
        }

        let name = resolved
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks".to_string());
        Ok(self.add_queue(&name, &resolved)?.id)
    }

    // ---- lookups -----------------------------------------------------

    pub fn queue(&self, id: &QueueId) -> Option<Arc<TaskQueue>> {
        self.state.lock().queues.get(id).cloned()
    }

    /// First configured queue; the implicit target of the single-queue
    /// REST operations.
    pub fn primary_queue(&self) -> Option<Arc<TaskQueue>> {
        self.state.lock().queues.values().next().cloned()
    }

    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    pub fn list_queues(&self) -> Vec<QueueOverview> {
        let state = self.state.lock();
        state
            .manifest
            .queues
            .iter()
            .filter_map(|entry| {
                let queue = state.queues.get(&entry.id)?;
                Some(QueueOverview {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    yaml_path: entry.yaml_path.clone(),
                    created_at: entry.created_at,
                    status: queue.status(),
                })
            })
            .collect()
    }

    fn queues_snapshot(&self) -> Vec<(QueueId, Arc<TaskQueue>)> {
        self.state
            .lock()
            .queues
            .iter()
            .map(|(id, q)| (id.clone(), Arc::clone(q)))
            .collect()
    }

    /// Search live tasks across all queues, then histories.
    pub fn find_task(&self, task_id: &TaskId) -> Option<FoundTask> {
        let queues = self.queues_snapshot();
        for (queue_id, queue) in &queues {
            if let Some(task) = queue.get_task(task_id) {
                return Some(FoundTask::Live {
                    queue_id: queue_id.clone(),
                    task,
                });
            }
        }
        for (queue_id, queue) in &queues {
            if let Some(record) = queue.find_history(task_id) {
                return Some(FoundTask::Historical {
                    queue_id: queue_id.clone(),
                    record,
                });
            }
        }
        None
    }

    /// The queue holding `task_id` as a live task.
    pub fn queue_for_task(&self, task_id: &TaskId) -> Option<Arc<TaskQueue>> {
        self.queues_snapshot()
            .into_iter()
            .find(|(_, q)| q.get_task(task_id).is_some())
            .map(|(_, q)| q)
    }

    /// Union of reserved devices with the holding queue's name.
    pub fn busy_devices(&self) -> BTreeMap<u32, String> {
        self.ledger.busy()
    }

    pub fn ledger(&self) -> &Arc<DeviceLedger> {
        &self.ledger
    }

    // ---- settings ----------------------------------------------------

    pub fn push_token(&self) -> Option<String> {
        self.push_token.lock().clone()
    }

    /// Update the workspace push token and persist it.
    pub fn set_push_token(&self, token: Option<String>) {
        let token = token.and_then(|t| {
            let t = t.trim().to_string();
            (!t.is_empty()).then_some(t)
        });
        *self.push_token.lock() = token.clone();

        let mut state = self.state.lock();
        state.manifest.pushplus_token = token;
        if let Err(e) = state.manifest.save(&self.dir) {
            tracing::error!(error = %e, "failed to persist manifest; in-memory state remains authoritative");
        }
    }

    // ---- lifecycle ---------------------------------------------------

    /// Stop every running task across all queues.
    pub fn stop_all(&self) -> usize {
        self.queues_snapshot()
            .into_iter()
            .filter_map(|(_, q)| q.stop_running())
            .count()
    }

    /// Graceful shutdown: per queue, auto off, pending cancelled, running
    /// stopped; children are waited on in parallel, bounded by `grace`;
    /// the manifest is persisted last.
    pub async fn shutdown(&self, grace: Duration) {
        let queues: Vec<Arc<TaskQueue>> = self
            .queues_snapshot()
            .into_iter()
            .map(|(_, q)| q)
            .collect();

        for queue in &queues {
            queue.stop_auto();
            queue.stop_dispatcher();
            queue.cancel_pending();
            queue.stop_running();
        }

        let mut waits = Vec::new();
        for queue in &queues {
            let queue = Arc::clone(queue);
            waits.push(tokio::spawn(async move { queue.wait_idle(grace).await }));
        }
        for wait in waits {
            let _ = wait.await;
        }

        let mut state = self.state.lock();
        if let Err(e) = state.manifest.save(&self.dir) {
            tracing::error!(error = %e, "failed to persist manifest at shutdown");
        }
        tracing::info!("workspace shut down");
    }
}

/// Notifier wiring without a workspace: token from the process env or a
/// discovered `.env` only. Used by the foreground CLI runner and the pid
/// monitor.
pub fn env_notifier_factory(search_dir: PathBuf) -> NotifierFactory {
    default_notifier_factory(search_dir, Arc::new(Mutex::new(None)))
}

/// Production notifier wiring: resolve the token per send (workspace
/// settings, process env, discovered `.env`), honour silent mode from
/// either source, and hand back a PushPlus adapter.
fn default_notifier_factory(
    dir: PathBuf,
    push_token: Arc<Mutex<Option<String>>>,
) -> NotifierFactory {
    Arc::new(move || {
        if let Some(value) = env_files::lookup(&dir, tf_notify::SILENT_ENV_VAR) {
            if tf_notify::truthy(&value) {
                tracing::debug!("silent mode active, skipping notification");
                return None;
            }
        }
        let workspace_token = push_token.lock().clone();
        let token = tf_notify::resolve_token(workspace_token.as_deref())
            .or_else(|| env_files::lookup(&dir, tf_notify::TOKEN_ENV_VAR))?;
        Some(Arc::new(PushPlusNotifier::new(token)) as Arc<dyn NotifyAdapter>)
    })
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
