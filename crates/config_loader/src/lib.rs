//! # Config Loader
//!
//! Boot configuration loading.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality (strict path, used by `validate`)
//! - Read every option with a default (lenient path, used at boot)
//! - Parse memory-list description files
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_boot_config(Some(Path::new("driver.toml")));
//! println!("records go to {}", config.recording.directory);
//! ```

mod memory_list;
mod options;
mod parser;
mod validator;

pub use contracts::DriverConfig;
pub use memory_list::{
    load_memory_list, parse_memory_list, MemoryListSpec, DEFAULT_MEMORY_LIST_FREQUENCY,
};
pub use options::BootOptions;
pub use parser::ConfigFormat;
pub use validator::INFO_CHANNEL_NAME;

use contracts::{
    ChannelConfig, ContractError, EventConfig, InfoConfig, RecordingConfig, SchedulerConfig,
};
use std::path::Path;
use tracing::{info, warn};

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DriverConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load and validate configuration from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<DriverConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already built configuration
    pub fn validate(config: &DriverConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Boot path: never fails
    ///
    /// A missing path or unreadable file yields all defaults; malformed options
    /// are logged and replaced by their defaults; invalid channel/event entries
    /// are skipped with a warning.
    pub fn load_boot_config(path: Option<&Path>) -> DriverConfig {
        let Some(path) = path else {
            info!("no config file given, using defaults");
            return DriverConfig::default();
        };

        let document = Self::detect_format(path).and_then(|format| {
            let content = std::fs::read_to_string(path)?;
            parser::parse_document(&content, format)
        });

        match document {
            Ok(doc) => Self::from_options(&BootOptions::new(doc)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config file, using defaults");
                DriverConfig::default()
            }
        }
    }

    /// Lenient load from string
    pub fn load_boot_config_str(content: &str, format: ConfigFormat) -> DriverConfig {
        match parser::parse_document(content, format) {
            Ok(doc) => Self::from_options(&BootOptions::new(doc)),
            Err(e) => {
                warn!(error = %e, "could not parse config, using defaults");
                DriverConfig::default()
            }
        }
    }

    /// Build a configuration option by option
    pub fn from_options(opts: &BootOptions) -> DriverConfig {
        let sched = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            idle_backoff_ms: opts.get("scheduler.idle_backoff_ms", sched.idle_backoff_ms),
            publish_on_start: opts.get("scheduler.publish_on_start", sched.publish_on_start),
            log_on_start: opts.get("scheduler.log_on_start", sched.log_on_start),
        };

        let rec = RecordingConfig::default();
        let mut recording = RecordingConfig {
            directory: opts.get("recording.directory", rec.directory.clone()),
            prefix: opts.get("recording.prefix", rec.prefix.clone()),
            buffer_duration_s: opts.get("recording.buffer_duration_s", rec.buffer_duration_s),
            buffer_frequency_hz: opts.get("recording.buffer_frequency_hz", rec.buffer_frequency_hz),
            max_folder_bytes: opts.get("recording.max_folder_bytes", rec.max_folder_bytes),
        };
        if !(recording.buffer_duration_s > 0.0 && recording.buffer_duration_s.is_finite()) {
            warn!(value = recording.buffer_duration_s, "invalid buffer duration, using default");
            recording.buffer_duration_s = rec.buffer_duration_s;
        }
        if !(recording.buffer_frequency_hz > 0.0 && recording.buffer_frequency_hz.is_finite()) {
            warn!(value = recording.buffer_frequency_hz, "invalid buffer frequency, using default");
            recording.buffer_frequency_hz = rec.buffer_frequency_hz;
        }

        let inf = InfoConfig::default();
        let info = InfoConfig {
            enabled: opts.get("info.enabled", inf.enabled),
            keys: opts.get("info.keys", inf.keys),
        };

        let channels = opts
            .entries("channels")
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let entry = serde_json::from_value::<ChannelConfig>(raw)
                    .map_err(|e| ContractError::config_parse(e.to_string()))
                    .and_then(|c| validator::check_channel(&c).map(|_| c));
                match entry {
                    Ok(channel) => Some(channel),
                    Err(e) => {
                        warn!(index = idx, error = %e, "skipping invalid channel entry");
                        None
                    }
                }
            })
            .collect();

        let events = opts
            .entries("events")
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let entry = serde_json::from_value::<EventConfig>(raw)
                    .map_err(|e| ContractError::config_parse(e.to_string()))
                    .and_then(|e| validator::check_event(&e).map(|_| e));
                match entry {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!(index = idx, error = %e, "skipping invalid event entry");
                        None
                    }
                }
            })
            .collect();

        DriverConfig {
            scheduler,
            recording,
            info,
            channels,
            events,
        }
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(config: &DriverConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize configuration to JSON string
    pub fn to_json(config: &DriverConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TOML: &str = r#"
[scheduler]
idle_backoff_ms = 200

[recording]
directory = "/tmp/robot_records"
buffer_duration_s = 5.0

[[channels]]
name = "battery"
key = "Device/Battery/Charge"
frequency_hz = 1.0
data_type = "float"

[[events]]
name = "right_bumper"
key = "RightBumperPressed"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.scheduler.idle_backoff_ms, 200);
        assert_eq!(config.channels[0].name, "battery");
        assert_eq!(config.events[0].name, "right_bumper");
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_strict_load_rejects_negative_frequency() {
        let content = r#"
[[channels]]
name = "battery"
key = "Battery"
frequency_hz = -1.0
"#;
        assert!(ConfigLoader::load_from_str(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_boot_config_applies_defaults_for_malformed_options() {
        let content = r#"
[scheduler]
idle_backoff_ms = "soon"

[recording]
buffer_duration_s = -3.0
prefix = "lab"

[[channels]]
name = "battery"
key = "Battery"
frequency_hz = -1.0

[[channels]]
name = "sonar"
key = "Sonar/Left"
frequency_hz = 10.0

[[channels]]
key = "NoName"
"#;
        let config = ConfigLoader::load_boot_config_str(content, ConfigFormat::Toml);
        assert_eq!(config.scheduler.idle_backoff_ms, 1000);
        assert_eq!(config.recording.buffer_duration_s, 10.0);
        assert_eq!(config.recording.prefix, "lab");
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "sonar");
    }

    #[test]
    fn test_boot_config_missing_file() {
        let config = ConfigLoader::load_boot_config(Some(Path::new("/nonexistent/driver.toml")));
        assert_eq!(config, DriverConfig::default());
        assert_eq!(ConfigLoader::load_boot_config(None), DriverConfig::default());
    }

    #[test]
    fn test_boot_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.toml");
        std::fs::write(&path, SAMPLE_TOML).unwrap();
        let config = ConfigLoader::load_boot_config(Some(&path));
        assert_eq!(config.recording.directory, "/tmp/robot_records");
        assert_eq!(config.recording.buffer_duration_s, 5.0);
    }
}
