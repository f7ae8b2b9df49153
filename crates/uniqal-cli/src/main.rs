#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, RunConfig};
use telemetry::init_telemetry;
use tokio::signal;
use tracing::Instrument;
use uniqal::{FileStore, Supervisor};

// Using mimalloc for better performance under contention from many worker
// threads allocating short strings.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    let providers = init_telemetry()?;
    let result = run(config).await;
    providers.shutdown();
    result
}

async fn run(config: RunConfig) -> anyhow::Result<()> {
    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let existing = FileStore::load(&config.output)
        .with_context(|| format!("failed to read {}", config.output.display()))?;
    let store = FileStore::open(&config.output)
        .with_context(|| format!("failed to open {}", config.output.display()))?;

    log_startup_info(&config, existing.len());

    let span = tracing::info_span!("run", output = %config.output.display());
    let summary = Supervisor::new(config.supervisor, existing, store)
        .run(shutdown_signal())
        .instrument(span)
        .await?;

    tracing::info!(
        generated = summary.generated,
        persisted = summary.accepted,
        duplicates = summary.rejected,
        "Total generated values: {}",
        summary.generated
    );
    Ok(())
}

fn log_startup_info(config: &RunConfig, existing: usize) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting generation with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting generation with {} workers",
            config.supervisor.num_workers
        );
    }
    tracing::info!(
        "Saving values to {} ({} already present)",
        config.output.display(),
        existing
    );
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Stopping generation, waiting for workers to retire...");
}
