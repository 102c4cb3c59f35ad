// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters
//!
//! Terminal task transitions are summarised into a templated message and
//! handed to a [`NotifyAdapter`]. Sends run on their own tokio task and
//! never block task completion or the auto-dispatcher.

mod message;
mod noop;
mod pushplus;
mod silent;

pub use message::{task_message, NotifyMessage};
pub use noop::NoopNotifier;
pub use pushplus::PushPlusNotifier;
pub use silent::{silent_mode_active, truthy, SILENT_ENV_VAR};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifier, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for sending notifications
#[async_trait]
pub trait NotifyAdapter: Send + Sync + 'static {
    /// Send a notification with a title and message body
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Name of the environment variable carrying the push token when the
/// workspace manifest does not.
pub const TOKEN_ENV_VAR: &str = "MSG_PUSH_TOKEN";

/// Resolve the push token: workspace settings first, then the
/// `MSG_PUSH_TOKEN` environment variable. `None` means notifications are
/// silently skipped.
pub fn resolve_token(workspace_token: Option<&str>) -> Option<String> {
    if let Some(token) = workspace_token {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
