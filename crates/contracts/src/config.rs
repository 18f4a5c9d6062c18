//! Boot configuration contracts shared across crates.

use serde::{Deserialize, Serialize};

use crate::DataType;

/// Complete driver boot configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub info: InfoConfig,

    /// Polled memory channels
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,

    /// Push-driven memory events
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

impl DriverConfig {
    /// Enabled channel entries
    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.enabled)
    }

    /// Enabled event entries
    pub fn enabled_events(&self) -> impl Iterator<Item = &EventConfig> {
        self.events.iter().filter(|e| e.enabled)
    }
}

/// Scheduling loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Idle sleep when nothing is registered (milliseconds)
    pub idle_backoff_ms: u64,
    /// Enable live publishing once the driver is wired
    pub publish_on_start: bool,
    /// Enable log buffering at boot
    pub log_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: 1000,
            publish_on_start: true,
            log_on_start: true,
        }
    }
}

/// Durable log and rolling buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Durable log directory
    pub directory: String,
    /// Default prefix for durable logs opened by `start_recording`
    pub prefix: String,
    /// Rolling buffer retention (seconds)
    pub buffer_duration_s: f64,
    /// Target log-buffer sampling rate (Hz)
    pub buffer_frequency_hz: f64,
    /// Storage budget for the durable log directory (bytes)
    pub max_folder_bytes: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: "./records".to_string(),
            prefix: "robot_driver".to_string(),
            buffer_duration_s: 10.0,
            buffer_frequency_hz: 10.0,
            max_folder_bytes: 2_000_000_000,
        }
    }
}

/// One-shot robot info channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub enabled: bool,
    /// Memory keys read once into the info message
    pub keys: Vec<String>,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keys: vec![
                "RobotConfig/Body/Type".to_string(),
                "RobotConfig/Body/BaseVersion".to_string(),
            ],
        }
    }
}

/// Polled memory channel entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel name, also used as the transport topic
    pub name: String,
    /// Memory key polled on every tick
    pub key: String,
    /// Nominal frequency; 0 fires once
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,
    /// Scalar type; `None` infers from the probed value
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub publish: bool,
    #[serde(default = "default_true")]
    pub record: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Push-driven memory event entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    pub name: String,
    /// Memory key whose changes are pushed
    pub key: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_frequency() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.scheduler.idle_backoff_ms, 1000);
        assert_eq!(config.recording.buffer_duration_s, 10.0);
        assert!(config.info.enabled);
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_channel_entry_defaults() {
        let json = r#"{ "name": "battery", "key": "Battery/Charge" }"#;
        let channel: ChannelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(channel.frequency_hz, 10.0);
        assert_eq!(channel.data_type, DataType::None);
        assert!(channel.publish && channel.record && channel.enabled);
    }
}
