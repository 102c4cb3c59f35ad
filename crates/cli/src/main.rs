// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! taskflow - multi-queue task supervisor CLI

mod color;
mod monitor_cmd;
mod run_cmd;
mod status_cmd;
mod web_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "taskflow",
    version,
    about = "Run queues of long-lived commands with logs, GPUs, and notifications"
)]
struct Cli {
    /// Task configuration file to run in the foreground
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP/WebSocket backend
    Web {
        /// Task configuration file to register on boot
        #[arg(value_name = "CONFIG")]
        config: Option<PathBuf>,
        /// Workspace directory (holds .workspace.json)
        #[arg(short = 'w', long = "workspace", default_value = ".")]
        workspace: PathBuf,
        /// Listen host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Listen port
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Accepted for compatibility; hot reload is not supported
        #[arg(long, hide = true)]
        reload: bool,
    },
    /// List running backend instances
    Status,
    /// Watch an external PID and notify when it exits
    Monitor {
        /// Process id to watch
        pid: u32,
        /// Display name used in the notification
        #[arg(long)]
        name: Option<String>,
        /// Do not send a notification, just wait and report
        #[arg(long)]
        silent: bool,
    },
}

#[tokio::main]
async fn main() {
    // Bad arguments exit 1, matching the documented CLI contract.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.exit_code() == 0 { 0 } else { 1 };
            std::process::exit(code);
        }
    };

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Console-only tracing for the non-server commands; `web` installs its
/// own stdout+file subscriber instead.
fn init_cli_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if !matches!(cli.command, Some(Commands::Web { .. })) {
        init_cli_tracing();
    }
    match cli.command {
        None => {
            let Some(config) = cli.config else {
                anyhow::bail!("missing configuration file (try `taskflow tasks.yaml` or `taskflow web`)");
            };
            run_cmd::run(config).await
        }
        Some(Commands::Web {
            config,
            workspace,
            host,
            port,
            reload,
        }) => {
            if reload {
                tracing::warn!("--reload is accepted for compatibility and ignored");
            }
            web_cmd::run(config, workspace, host, port).await
        }
        Some(Commands::Status) => status_cmd::run(),
        Some(Commands::Monitor { pid, name, silent }) => {
            monitor_cmd::run(pid, name, silent).await
        }
    }
}
