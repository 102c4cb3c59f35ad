// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application state threaded through request handlers.

use crate::api::auth::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tf_engine::Workspace;

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub sessions: Arc<SessionStore>,
    /// Backend's own log file, served by `GET /api/main-log`.
    pub main_log: Option<PathBuf>,
}

impl AppState {
    pub fn new(workspace: Arc<Workspace>, main_log: Option<PathBuf>) -> Self {
        Self {
            workspace,
            sessions: Arc::new(SessionStore::at_default_path()),
            main_log,
        }
    }

    /// Swap the session store (tests use a temp password file).
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}
