//! Compilation job service binary.
//!
//! Serves the job API over HTTP/JSON. Settings come from an optional YAML
//! file, then `QCOMP_*` environment variables, then command-line flags.
//!
//! # Usage
//!
//! ```bash
//! QCOMP_API_KEY=secret qcomp-server --config qcomp.yaml --port 9000
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use qcomp_compile::BackendRegistry;
use qcomp_service::rest::{AppState, auth::AuthState, rest_router};
use qcomp_service::{Config, Dispatcher, JobStore, StorageBackend, health, init_tracing, retention};

/// Quantum circuit compilation job service
#[derive(Debug, Parser)]
#[command(name = "qcomp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "QCOMP_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Concurrent compilations
    #[arg(short, long)]
    workers: Option<usize>,

    /// Job store backend (memory or sqlite)
    #[arg(long)]
    storage: Option<StorageBackend>,

    /// SQLite database file
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(workers) = self.workers {
            config.dispatcher.workers = workers;
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(path) = self.storage_path {
            config.storage.path = Some(path);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    let config = args.apply(config)?;

    init_tracing(
        &config.observability.log_level,
        config.observability.log_format,
    )
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    health::init_start_time();

    info!(?config, "Starting compilation service");

    if config.server.api_key.is_some() {
        info!("API key authentication enabled");
    } else {
        warn!("No API key configured (QCOMP_API_KEY). Server is unauthenticated.");
    }

    let store = JobStore::from_config(&config.storage)
        .await
        .context("failed to open job store")?;
    let registry = Arc::new(BackendRegistry::with_defaults());
    let dispatcher = Dispatcher::new(store.clone(), registry, config.dispatcher_config());

    let report = dispatcher
        .recover()
        .await
        .context("failed to recover jobs from the store")?;
    if report.requeued > 0 || report.interrupted > 0 {
        info!(
            requeued = report.requeued,
            interrupted = report.interrupted,
            "Recovered jobs from previous run"
        );
    }

    let sweeper = config.retention_period().map(|period| {
        info!(retention_secs = period.as_secs(), "Retention sweep enabled");
        retention::spawn_sweeper(
            store,
            period,
            std::time::Duration::from_secs(config.retention.sweep_interval_seconds),
        )
    });

    let state = AppState {
        dispatcher: dispatcher.clone(),
        auth: AuthState::new(config.server.api_key.as_deref()),
        request_timeout: config.request_timeout(),
        metrics_enabled: config.observability.metrics_enabled,
    };
    let app = rest_router(state, config.server.cors_origins.as_deref());

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining running compilations");
    if let Some(handle) = sweeper {
        handle.abort();
    }
    dispatcher.shutdown().await;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
