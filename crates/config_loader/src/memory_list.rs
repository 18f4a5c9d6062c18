//! Memory-list description files
//!
//! A JSON document describing one polled channel that reads several memory
//! keys into a single message:
//!
//! ```json
//! { "topic": "joint_temperatures", "frequency": 5, "memKeys": ["A", "B"] }
//! ```

use std::path::Path;

use contracts::ContractError;
use serde_json::Value;
use tracing::warn;

/// Frequency applied when the file gives none
pub const DEFAULT_MEMORY_LIST_FREQUENCY: f64 = 10.0;

/// Parsed memory-list description
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryListSpec {
    pub topic: String,
    pub frequency_hz: f64,
    pub keys: Vec<String>,
}

/// Load a memory-list description from a JSON file
pub fn load_memory_list(path: &Path) -> Result<MemoryListSpec, ContractError> {
    let content = std::fs::read_to_string(path)?;
    parse_memory_list(&content)
}

/// Parse a memory-list description
///
/// A missing or malformed frequency falls back to
/// [`DEFAULT_MEMORY_LIST_FREQUENCY`]; a missing topic or empty key list
/// refuses the document.
pub fn parse_memory_list(content: &str) -> Result<MemoryListSpec, ContractError> {
    let doc: Value = serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("memory list parse error: {e}"),
        source: Some(Box::new(e)),
    })?;

    let frequency_hz = match doc.get("frequency").map(|f| (f, f.as_f64())) {
        Some((_, Some(hz))) if hz.is_finite() && hz >= 0.0 => hz,
        Some((raw, _)) => {
            warn!(found = %raw, fallback_hz = DEFAULT_MEMORY_LIST_FREQUENCY, "malformed memory list frequency");
            DEFAULT_MEMORY_LIST_FREQUENCY
        }
        None => {
            warn!(fallback_hz = DEFAULT_MEMORY_LIST_FREQUENCY, "memory list has no frequency");
            DEFAULT_MEMORY_LIST_FREQUENCY
        }
    };

    let topic = doc
        .get("topic")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ContractError::config_validation("topic", "memory list has no topic"))?
        .to_string();

    let keys = doc
        .get("memKeys")
        .and_then(Value::as_array)
        .ok_or_else(|| ContractError::config_validation("memKeys", "memory list has no key list"))?
        .iter()
        .map(|k| {
            k.as_str().map(str::to_string).ok_or_else(|| {
                ContractError::config_validation("memKeys", format!("key is not a string: {k}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if keys.is_empty() {
        return Err(ContractError::config_validation("memKeys", "memory list is empty"));
    }

    Ok(MemoryListSpec {
        topic,
        frequency_hz,
        keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let spec = parse_memory_list(
            r#"{ "topic": "temps", "frequency": 5, "memKeys": ["A", "B"] }"#,
        )
        .unwrap();
        assert_eq!(spec.topic, "temps");
        assert_eq!(spec.frequency_hz, 5.0);
        assert_eq!(spec.keys, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_frequency_defaults() {
        let spec = parse_memory_list(r#"{ "topic": "temps", "memKeys": ["A"] }"#).unwrap();
        assert_eq!(spec.frequency_hz, DEFAULT_MEMORY_LIST_FREQUENCY);

        let spec =
            parse_memory_list(r#"{ "topic": "temps", "frequency": "fast", "memKeys": ["A"] }"#)
                .unwrap();
        assert_eq!(spec.frequency_hz, DEFAULT_MEMORY_LIST_FREQUENCY);
    }

    #[test]
    fn test_refuses_missing_topic_or_keys() {
        assert!(parse_memory_list(r#"{ "memKeys": ["A"] }"#).is_err());
        assert!(parse_memory_list(r#"{ "topic": "t", "memKeys": [] }"#).is_err());
        assert!(parse_memory_list(r#"{ "topic": "t", "memKeys": [1] }"#).is_err());
        assert!(parse_memory_list(r#"{ "topic": "t" }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, r#"{ "topic": "t", "memKeys": ["K"] }"#).unwrap();
        assert_eq!(load_memory_list(&path).unwrap().keys, vec!["K"]);
    }
}
