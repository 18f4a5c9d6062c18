//! 配置校验模块
//!
//! 校验规则：
//! - channel / event / info 名称全局唯一
//! - frequency_hz >= 0 且有限
//! - buffer_duration_s > 0, buffer_frequency_hz > 0
//! - key 非空

use std::collections::HashSet;

use contracts::{ChannelConfig, ContractError, DriverConfig, EventConfig, RecordingConfig};

/// 保留给 info 通道的名称
pub const INFO_CHANNEL_NAME: &str = "info";

/// 校验 DriverConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &DriverConfig) -> Result<(), ContractError> {
    validate_recording(&config.recording)?;
    validate_names(config)?;
    for (idx, channel) in config.channels.iter().enumerate() {
        check_channel(channel).map_err(|e| prefix_field(e, &format!("channels[{idx}]")))?;
    }
    for (idx, event) in config.events.iter().enumerate() {
        check_event(event).map_err(|e| prefix_field(e, &format!("events[{idx}]")))?;
    }
    if config.info.enabled && config.info.keys.is_empty() {
        return Err(ContractError::config_validation(
            "info.keys",
            "info channel is enabled but has no keys",
        ));
    }
    Ok(())
}

/// 校验单个 channel 条目 (宽松加载也会调用)
pub fn check_channel(channel: &ChannelConfig) -> Result<(), ContractError> {
    if channel.name.trim().is_empty() {
        return Err(ContractError::config_validation("name", "name cannot be empty"));
    }
    if channel.key.trim().is_empty() {
        return Err(ContractError::config_validation("key", "key cannot be empty"));
    }
    if !channel.frequency_hz.is_finite() || channel.frequency_hz < 0.0 {
        return Err(ContractError::config_validation(
            "frequency_hz",
            format!("frequency_hz must be finite and >= 0, got {}", channel.frequency_hz),
        ));
    }
    Ok(())
}

/// 校验单个 event 条目
pub fn check_event(event: &EventConfig) -> Result<(), ContractError> {
    if event.name.trim().is_empty() {
        return Err(ContractError::config_validation("name", "name cannot be empty"));
    }
    if event.key.trim().is_empty() {
        return Err(ContractError::config_validation("key", "key cannot be empty"));
    }
    Ok(())
}

fn validate_recording(recording: &RecordingConfig) -> Result<(), ContractError> {
    if !(recording.buffer_duration_s > 0.0 && recording.buffer_duration_s.is_finite()) {
        return Err(ContractError::config_validation(
            "recording.buffer_duration_s",
            format!("must be > 0, got {}", recording.buffer_duration_s),
        ));
    }
    if !(recording.buffer_frequency_hz > 0.0 && recording.buffer_frequency_hz.is_finite()) {
        return Err(ContractError::config_validation(
            "recording.buffer_frequency_hz",
            format!("must be > 0, got {}", recording.buffer_frequency_hz),
        ));
    }
    if recording.directory.trim().is_empty() {
        return Err(ContractError::config_validation(
            "recording.directory",
            "directory cannot be empty",
        ));
    }
    Ok(())
}

/// 名称唯一性 (channels + events + info)
fn validate_names(config: &DriverConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    if config.info.enabled {
        seen.insert(INFO_CHANNEL_NAME);
    }
    for channel in &config.channels {
        if !seen.insert(channel.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("channels[name={}]", channel.name),
                "duplicate name",
            ));
        }
    }
    for event in &config.events {
        if !seen.insert(event.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("events[name={}]", event.name),
                "duplicate name",
            ));
        }
    }
    Ok(())
}

fn prefix_field(err: ContractError, prefix: &str) -> ContractError {
    match err {
        ContractError::ConfigValidation { field, message } => {
            ContractError::config_validation(format!("{prefix}.{field}"), message)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DataType;

    fn channel(name: &str, frequency_hz: f64) -> ChannelConfig {
        ChannelConfig {
            name: name.into(),
            key: format!("Device/{name}"),
            frequency_hz,
            data_type: DataType::None,
            publish: true,
            record: true,
            enabled: true,
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = DriverConfig::default();
        config.channels.push(channel("battery", 1.0));
        config.channels.push(channel("odom", 0.0));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_name_across_roles() {
        let mut config = DriverConfig::default();
        config.channels.push(channel("bumper", 1.0));
        config.events.push(EventConfig {
            name: "bumper".into(),
            key: "RightBumperPressed".into(),
            data_type: DataType::Float,
            enabled: true,
        });
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_info_name_is_reserved() {
        let mut config = DriverConfig::default();
        config.channels.push(channel(INFO_CHANNEL_NAME, 1.0));
        assert!(validate(&config).is_err());

        config.info.enabled = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_negative_frequency() {
        let mut config = DriverConfig::default();
        config.channels.push(channel("battery", -2.0));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("channels[0].frequency_hz"));
    }

    #[test]
    fn test_nan_frequency() {
        assert!(check_channel(&channel("battery", f64::NAN)).is_err());
    }

    #[test]
    fn test_zero_buffer_duration() {
        let mut config = DriverConfig::default();
        config.recording.buffer_duration_s = 0.0;
        assert!(validate(&config).is_err());
    }
}
