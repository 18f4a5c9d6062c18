//! Lenient "option with default" access over a parsed config document.
//!
//! Boot configuration must never be fatal: every malformed option is logged
//! and replaced by its default.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Parsed boot options
#[derive(Debug, Clone, Default)]
pub struct BootOptions {
    root: Value,
}

impl BootOptions {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Options with nothing set; every lookup yields its default
    pub fn empty() -> Self {
        Self { root: Value::Null }
    }

    /// Raw node at a dotted path (`"recording.buffer_duration_s"`)
    pub fn node(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.root, |node, segment| node.get(segment))
    }

    /// Read option `path`, falling back to `default` when missing or malformed
    pub fn get<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        let Some(node) = self.node(path) else {
            return default;
        };
        match serde_json::from_value(node.clone()) {
            Ok(value) => value,
            Err(e) => {
                warn!(option = %path, error = %e, "malformed boot option, using default");
                default
            }
        }
    }

    /// Entries of an array option; a non-array is logged and treated as empty
    pub fn entries(&self, path: &str) -> Vec<Value> {
        match self.node(path) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                warn!(option = %path, found = %other, "expected a list, ignoring option");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_present_and_missing() {
        let opts = BootOptions::new(json!({ "scheduler": { "idle_backoff_ms": 250 } }));
        assert_eq!(opts.get("scheduler.idle_backoff_ms", 1000u64), 250);
        assert_eq!(opts.get("scheduler.publish_on_start", true), true);
        assert_eq!(opts.get("missing.path", 3.5f64), 3.5);
    }

    #[test]
    fn test_malformed_option_uses_default() {
        let opts = BootOptions::new(json!({ "recording": { "buffer_duration_s": "ten" } }));
        assert_eq!(opts.get("recording.buffer_duration_s", 10.0f64), 10.0);
    }

    #[test]
    fn test_entries_non_array() {
        let opts = BootOptions::new(json!({ "channels": { "name": "x" } }));
        assert!(opts.entries("channels").is_empty());
        assert!(BootOptions::empty().entries("channels").is_empty());
    }
}
