// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for tests.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded `notify` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyCall {
    pub title: String,
    pub message: String,
}

/// Records every send; optionally fails the first `fail_first` calls so
/// retry behaviour can be observed.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
    fail_first: Arc<Mutex<u32>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends return an error.
    pub fn fail_next(&self, n: u32) {
        *self.fail_first.lock() = n;
    }

    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        {
            let mut remaining = self.fail_first.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NotifyError::SendFailed("injected failure".to_string()));
            }
        }
        self.calls.lock().push(NotifyCall {
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
