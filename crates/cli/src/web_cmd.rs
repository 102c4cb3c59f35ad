// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `taskflow web`: serve the HTTP/WebSocket backend.

use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use tf_engine::env_files;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub async fn run(
    config: Option<PathBuf>,
    workspace: PathBuf,
    host: String,
    port: u16,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("cannot create workspace directory {}", workspace.display()))?;
    let workspace = std::fs::canonicalize(&workspace)?;

    env_files::load_into_process(&workspace);

    // The backend's own log goes to a file next to the task logs; the
    // REST surface replays it via /api/main-log.
    let logs_dir = workspace.join("logs");
    std::fs::create_dir_all(&logs_dir)?;
    let main_log = logs_dir.join(format!(
        "taskflow_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file_appender = tracing_appender::rolling::never(
        &logs_dir,
        main_log
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "taskflow.log".to_string()),
    );
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    tf_web::serve(tf_web::ServeOptions {
        host,
        port,
        workspace_dir: workspace,
        config,
        main_log: Some(main_log),
        registry_dir: None,
    })
    .await?;
    Ok(())
}
