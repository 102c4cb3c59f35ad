// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/WebSocket surface over the engine.
//!
//! A thin shell: request handlers translate between the REST/WS wire
//! shapes and the engine's API, with application state threaded through
//! axum's `State` extractor rather than process-wide globals.

pub mod api;
pub mod instances;
mod state;
mod ws;

pub use state::AppState;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tf_engine::Workspace;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Engine(#[from] tf_engine::EngineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid listen address {addr}: {message}")]
    BadAddr { addr: String, message: String },
}

/// Build the full application router over `state`.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/queues", get(api::queues::list).post(api::queues::create))
        .route("/api/queues/{qid}", delete(api::queues::remove))
        .route("/api/queues/{qid}/tasks", get(api::queues::tasks))
        .route("/api/queues/{qid}/history", get(api::queues::history))
        .route("/api/tasks/{tid}/run", post(api::execute::run_task))
        .route("/api/tasks/{tid}/stop", post(api::execute::stop_task))
        .route("/api/tasks/{tid}/retry", post(api::execute::retry_task))
        .route("/api/stop-all", post(api::execute::stop_all))
        .route("/api/start-queue", post(api::execute::start_queue))
        .route("/api/stop-queue", post(api::execute::stop_queue))
        .route("/api/queue-status", get(api::execute::queue_status))
        .route("/api/main-log", get(api::execute::main_log))
        .route("/api/reload", post(api::execute::reload))
        .route("/api/check-yaml", get(api::execute::check_yaml))
        .route("/api/load-new-tasks", post(api::execute::load_new_tasks))
        .route(
            "/api/load-selected-tasks",
            post(api::execute::load_selected_tasks),
        )
        .route("/api/logs/{tid}", get(api::execute::task_log))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_auth,
        ));

    Router::new()
        .route("/api/auth/status", get(api::auth::status))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/setup", post(api::auth::setup))
        .route("/ws/logs/{tid}", get(ws::logs))
        .route("/ws/status", get(ws::status))
        .merge(protected)
        .fallback(|| async { (StatusCode::NOT_FOUND, "not found") })
        .with_state(state)
}

/// Options for [`serve`].
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub workspace_dir: PathBuf,
    /// Optional single configuration to register on boot.
    pub config: Option<PathBuf>,
    /// Path of the backend's own log file, exposed by `/api/main-log`.
    pub main_log: Option<PathBuf>,
    /// Override of the instance-registry directory (tests).
    pub registry_dir: Option<PathBuf>,
}

/// Open the workspace, register this instance, and serve until SIGINT.
pub async fn serve(opts: ServeOptions) -> Result<(), ServeError> {
    let workspace = Workspace::open(&opts.workspace_dir)?;
    if let Some(config) = &opts.config {
        workspace.add_single_yaml(config)?;
    }

    let state = AppState::new(Arc::clone(&workspace), opts.main_log.clone());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .map_err(|e: std::net::AddrParseError| ServeError::BadAddr {
            addr: format!("{}:{}", opts.host, opts.port),
            message: e.to_string(),
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, workspace = %opts.workspace_dir.display(), "backend listening");

    let registry_dir = opts
        .registry_dir
        .clone()
        .unwrap_or_else(instances::default_registry_dir);
    let record = instances::InstanceRecord::current(local.port(), &opts.workspace_dir);
    let pid = record.pid;
    if let Err(e) = instances::register(&registry_dir, &record) {
        tracing::warn!(error = %e, "failed to register backend instance");
    }

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await;

    workspace.shutdown(tf_engine::SHUTDOWN_GRACE).await;
    if let Err(e) = instances::unregister(&registry_dir, pid) {
        tracing::warn!(error = %e, "failed to remove instance record");
    }
    result.map_err(ServeError::from)
}
