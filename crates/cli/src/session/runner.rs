//! Session runner - wires the driver to the simulated robot and drives it.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use acquisition::{MockMemory, RobotSimulator, SimulatorConfig};
use anyhow::{Context, Result};
use contracts::DriverConfig;
use driver::{Driver, DriverSettings, TickReport};
use observability::TickStatsAggregator;
use sinks::{FileLogStorage, LogTransport};
use tracing::{info, warn};

use super::SessionStats;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Boot configuration
    pub config: DriverConfig,

    /// Run length (None = until the shutdown signal)
    pub duration: Option<Duration>,

    /// Start recording once wired
    pub record: bool,

    /// Dump the rolling buffer under this prefix before exiting
    pub dump_on_exit: Option<String>,

    /// Extra memory-list channel descriptions
    pub memory_lists: Vec<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Simulated robot update rate (Hz)
    pub sim_frequency: f64,
}

/// One driver run
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves or the configured duration elapses
    pub async fn run<S>(self, shutdown: S) -> Result<SessionStats>
    where
        S: Future<Output = ()>,
    {
        let config = &self.config;

        if let Some(port) = config.metrics_port {
            observability::init_metrics(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Collaborators
        let memory = Arc::new(MockMemory::new());
        let simulator = RobotSimulator::new(
            Arc::clone(&memory),
            SimulatorConfig {
                frequency_hz: config.sim_frequency,
                ..SimulatorConfig::default()
            },
        );
        simulator.start();

        let driver = Driver::new(
            DriverSettings::from(&config.config),
            memory,
            Arc::new(LogTransport::new("log")),
            Arc::new(FileLogStorage::new(&config.config.recording.directory)),
        );

        // Wiring
        let mut wiring = driver.wire(&config.config).await;
        for path in &config.memory_lists {
            match driver.add_memory_channels(path).await {
                Ok(topic) => wiring.channels.push(topic),
                Err(e) => wiring.skipped.push((path.display().to_string(), e.to_string())),
            }
        }
        info!(
            channels = wiring.channels.len(),
            events = wiring.events.len(),
            skipped = wiring.skipped.len(),
            "driver wired"
        );

        let mut written = Vec::new();
        if config.record {
            let location = driver
                .start_recording()
                .await
                .context("Failed to start recording")?;
            info!(location = %location, "recording started");
            written.push(location);
        }

        // Scheduling loop
        let aggregator = Arc::new(Mutex::new(TickStatsAggregator::new()));
        let observer = Arc::clone(&aggregator);
        let runner = driver.clone();
        let start = Instant::now();
        let loop_handle = tokio::spawn(async move {
            runner
                .run_with(move |report: &TickReport| {
                    let mut stats = observer.lock().unwrap_or_else(PoisonError::into_inner);
                    match &report.channel {
                        Some(channel) => stats.observe(
                            channel,
                            report.dispatched,
                            report.record_skipped,
                            report.is_failure(),
                            report.lateness_ms,
                        ),
                        None => stats.observe_idle(),
                    }
                })
                .await;
        });

        let deadline = async {
            match config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = shutdown => warn!("Received shutdown signal, stopping driver..."),
            _ = deadline => info!("Run duration elapsed, stopping driver..."),
        }

        // Wind down
        if let Some(prefix) = &config.dump_on_exit {
            match driver.dump(prefix).await {
                Ok(location) => written.push(location),
                Err(e) => warn!(prefix = %prefix, error = %e, "dump on exit refused"),
            }
        }
        if let Some(location) = driver.shutdown().await {
            written.push(location);
        }
        loop_handle.await.context("Scheduling loop task failed")?;
        simulator.stop();

        let ticks = aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary();

        Ok(SessionStats {
            duration: start.elapsed(),
            wiring,
            ticks,
            written,
        })
    }
}
