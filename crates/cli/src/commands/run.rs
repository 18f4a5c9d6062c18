//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_driver(args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
    }

    // Boot path: malformed options fall back to their defaults
    let config = config_loader::ConfigLoader::load_boot_config(args.config.as_deref());

    info!(
        channels = config.channels.len(),
        events = config.events.len(),
        directory = %config.recording.directory,
        "Configuration loaded"
    );

    let session_config = SessionConfig {
        config,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        record: args.record,
        dump_on_exit: args.dump_on_exit.clone(),
        memory_lists: args.memory_lists.clone(),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        sim_frequency: args.sim_frequency,
    };

    info!("Starting driver...");
    let stats = Session::new(session_config)
        .run(shutdown_signal())
        .await
        .context("Driver session failed")?;

    info!(
        duration_secs = stats.duration.as_secs_f64(),
        ticks = stats.ticks.total_ticks,
        failures = stats.ticks.failures,
        logs = stats.written.len(),
        "Driver finished"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
