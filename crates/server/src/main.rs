// SPDX-License-Identifier: MIT
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oted: the task execution service's HTTP daemon.

use std::sync::Arc;

use ote_engine::{EventHub, Manager};
use ote_server::{AppState, Config};
use ote_storage::{SqliteConfig, SqliteTaskStore, TaskStore};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().map_err(|e| {
        eprintln!("failed to load configuration: {e}");
        e
    })?;

    let _log_guard = setup_logging(&config);
    info!("starting oted");

    let store: Arc<dyn TaskStore> = Arc::new(
        SqliteTaskStore::connect(SqliteConfig {
            path: config.db_file.clone(),
            max_idle_conns: config.db_max_idle_conns,
            max_open_conns: config.db_max_open_conns,
            max_conn_lifetime: config.db_max_conn_lifetime,
        })
        .await?,
    );

    let hub = EventHub::new();
    let manager = Manager::start(
        store,
        hub,
        config.task_logger_dir_path.clone(),
        config.cmd_validate,
    )
    .await?;

    let state = AppState {
        manager: manager.clone(),
        task_logger_dir_path: config.task_logger_dir_path.clone(),
    };
    let app = ote_server::build(state, config.swagger_file_path.as_deref());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port)).await?;
    info!(port = config.server_port, "listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        })
        .await?;

    manager.stop().await;
    info!("oted stopped");
    Ok(())
}

/// `tracing` + `env-filter` initialized from `DEBUG`/`RUST_LOG`, mirroring
/// the teacher's `setup_logging` (file appender when `LOG_FILE` is set,
/// stdout otherwise).
fn setup_logging(config: &ote_server::Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.debug { "debug" } else { "info" })
    });

    match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    error!(error = %e, "failed to create log directory");
                }
            }
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "oted.log".into());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}
