//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::DriverConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    scheduler: SchedulerInfo,
    recording: RecordingInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    info_keys: Vec<String>,
    channels: Vec<ChannelInfo>,
    events: Vec<EventInfo>,
}

#[derive(Serialize)]
struct SchedulerInfo {
    idle_backoff_ms: u64,
    publish_on_start: bool,
    log_on_start: bool,
}

#[derive(Serialize)]
struct RecordingInfo {
    directory: String,
    prefix: String,
    buffer_duration_s: f64,
    buffer_frequency_hz: f64,
    max_folder_bytes: u64,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: String,
    key: String,
    frequency_hz: f64,
    data_type: String,
    publish: bool,
    record: bool,
    enabled: bool,
}

#[derive(Serialize)]
struct EventInfo {
    name: String,
    key: String,
    data_type: String,
    enabled: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&config))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &DriverConfig) -> ConfigInfo {
    ConfigInfo {
        scheduler: SchedulerInfo {
            idle_backoff_ms: config.scheduler.idle_backoff_ms,
            publish_on_start: config.scheduler.publish_on_start,
            log_on_start: config.scheduler.log_on_start,
        },
        recording: RecordingInfo {
            directory: config.recording.directory.clone(),
            prefix: config.recording.prefix.clone(),
            buffer_duration_s: config.recording.buffer_duration_s,
            buffer_frequency_hz: config.recording.buffer_frequency_hz,
            max_folder_bytes: config.recording.max_folder_bytes,
        },
        info_keys: if config.info.enabled {
            config.info.keys.clone()
        } else {
            Vec::new()
        },
        channels: config
            .channels
            .iter()
            .map(|c| ChannelInfo {
                name: c.name.clone(),
                key: c.key.clone(),
                frequency_hz: c.frequency_hz,
                data_type: c.data_type.to_string(),
                publish: c.publish,
                record: c.record,
                enabled: c.enabled,
            })
            .collect(),
        events: config
            .events
            .iter()
            .map(|e| EventInfo {
                name: e.name.clone(),
                key: e.key.clone(),
                data_type: e.data_type.to_string(),
                enabled: e.enabled,
            })
            .collect(),
    }
}

fn print_config_info(config: &DriverConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Robot Driver Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let rec = &config.recording;
    println!("💾 Recording");
    println!("   ├─ Directory: {}", rec.directory);
    println!("   ├─ Prefix: {}", rec.prefix);
    println!("   ├─ Buffer: {}s at {} Hz", rec.buffer_duration_s, rec.buffer_frequency_hz);
    println!("   └─ Folder limit: {} bytes", rec.max_folder_bytes);

    if config.info.enabled {
        println!("\nℹ️  Info ({} keys)", config.info.keys.len());
        for (i, key) in config.info.keys.iter().enumerate() {
            let prefix = if i == config.info.keys.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}", prefix, key);
        }
    }

    println!("\n📡 Channels ({})", config.channels.len());
    for (i, channel) in config.channels.iter().enumerate() {
        let prefix = if i == config.channels.len() - 1 { "└─" } else { "├─" };
        let mut sinks = Vec::new();
        if channel.publish {
            sinks.push("publish");
        }
        if channel.record {
            sinks.push("record");
        }
        println!(
            "   {} {} <- {} ({} Hz, {}, {}){}",
            prefix,
            channel.name,
            channel.key,
            channel.frequency_hz,
            channel.data_type,
            sinks.join("+"),
            if channel.enabled { "" } else { " [disabled]" }
        );
    }

    println!("\n🔔 Events ({})", config.events.len());
    for (i, event) in config.events.iter().enumerate() {
        let prefix = if i == config.events.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} <- {} ({}){}",
            prefix,
            event.name,
            event.key,
            event.data_type,
            if event.enabled { "" } else { " [disabled]" }
        );
    }

    println!();
}
