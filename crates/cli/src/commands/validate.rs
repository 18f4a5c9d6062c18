//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::DriverConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    channel_count: usize,
    event_count: usize,
    info_keys: usize,
    record_directory: String,
    buffer_duration_s: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match result.error {
        None => Ok(()),
        Some(message) => Err(CliError::config_validation(message).into()),
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(CliError::config_not_found(&config_path).to_string()),
            config_path,
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
            summary: Some(ConfigSummary {
                channel_count: config.enabled_channels().count(),
                event_count: config.enabled_events().count(),
                info_keys: if config.info.enabled { config.info.keys.len() } else { 0 },
                record_directory: config.recording.directory.clone(),
                buffer_duration_s: config.recording.buffer_duration_s,
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &DriverConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.channels.is_empty() && config.events.is_empty() {
        warnings.push("No channels or events configured - only robot info will be acquired".to_string());
    }

    for channel in &config.channels {
        if !channel.enabled {
            warnings.push(format!("Channel '{}' is disabled", channel.name));
        } else if !channel.publish && !channel.record {
            warnings.push(format!(
                "Channel '{}' neither publishes nor records - it will be skipped",
                channel.name
            ));
        } else if channel.frequency_hz > 0.0 && channel.frequency_hz < config.recording.buffer_frequency_hz {
            warnings.push(format!(
                "Channel '{}' runs at {} Hz, below the buffer rate of {} Hz",
                channel.name, channel.frequency_hz, config.recording.buffer_frequency_hz
            ));
        }
    }

    for event in config.events.iter().filter(|e| !e.enabled) {
        warnings.push(format!("Event '{}' is disabled", event.name));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Channels: {}", summary.channel_count);
            println!("  Events: {}", summary.event_count);
            println!("  Info keys: {}", summary.info_keys);
            println!("  Record directory: {}", summary.record_directory);
            println!("  Buffer duration: {}s", summary.buffer_duration_s);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for(
            r#"
[[channels]]
name = "battery"
key = "Battery"
frequency_hz = 1.0

[[channels]]
name = "sonar"
key = "Sonar"
enabled = false
"#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        assert_eq!(result.summary.as_ref().map(|s| s.channel_count), Some(1));
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_duplicate_names_are_invalid() {
        let (_file, args) = args_for(
            r#"
[[channels]]
name = "battery"
key = "A"

[[events]]
name = "battery"
key = "B"
"#,
        );
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/driver.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
