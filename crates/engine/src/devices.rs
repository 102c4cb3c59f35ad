// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global device (GPU) ledger.
//!
//! The workspace's cross-queue exclusivity invariant lives here: for every
//! device integer, at most one running task holds it. Reservation and
//! release happen under one lock; queues waiting for devices park on the
//! release notifier.

use crate::EngineError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tf_core::{QueueId, TaskId};
use tokio::sync::Notify;

/// Who currently holds a device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceHolder {
    pub queue_id: QueueId,
    pub queue_name: String,
    pub task_id: TaskId,
    pub task_name: String,
}

#[derive(Default)]
pub struct DeviceLedger {
    reserved: Mutex<HashMap<u32, DeviceHolder>>,
    released: Notify,
}

impl DeviceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve every device in `devices` for `holder`, or fail naming the
    /// devices already taken and who holds them. All-or-nothing.
    ///
    /// A task re-using a device it already holds (same task id) is not a
    /// conflict; this keeps retry-after-partial-release safe.
    pub fn try_reserve(&self, devices: &[u32], holder: DeviceHolder) -> Result<(), EngineError> {
        let mut reserved = self.reserved.lock();

        let conflicts: Vec<(u32, &DeviceHolder)> = devices
            .iter()
            .filter_map(|d| {
                reserved
                    .get(d)
                    .filter(|h| h.task_id != holder.task_id)
                    .map(|h| (*d, h))
            })
            .collect();

        if !conflicts.is_empty() {
            let device_list = conflicts
                .iter()
                .map(|(d, _)| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let mut holders: Vec<String> =
                conflicts.iter().map(|(_, h)| h.queue_name.clone()).collect();
            holders.dedup();
            let holder_list = holders.join(", ");
            return Err(EngineError::DeviceConflict {
                summary: format!("GPU {device_list} in use by {holder_list}"),
                devices: conflicts.iter().map(|(d, _)| *d).collect(),
                holder: holder_list,
            });
        }

        for device in devices {
            reserved.insert(*device, holder.clone());
        }
        Ok(())
    }

    /// Drop every reservation held by `task_id` and wake waiting
    /// dispatchers. Unconditional; releasing nothing is fine.
    pub fn release_task(&self, task_id: &TaskId) {
        let mut reserved = self.reserved.lock();
        let before = reserved.len();
        reserved.retain(|_, holder| &holder.task_id != task_id);
        let released_any = reserved.len() != before;
        drop(reserved);

        if released_any {
            self.released.notify_waiters();
        }
    }

    /// Devices currently reserved, with the holding queue's name.
    pub fn busy(&self) -> BTreeMap<u32, String> {
        self.reserved
            .lock()
            .iter()
            .map(|(device, holder)| (*device, holder.queue_name.clone()))
            .collect()
    }

    /// Park until some task releases devices. Used by auto-dispatchers
    /// blocked on a conflict; they re-evaluate on every release.
    pub async fn wait_released(&self) {
        self.released.notified().await;
    }
}

#[cfg(test)]
#[path = "devices_tests.rs"]
mod tests;
