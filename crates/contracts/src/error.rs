//! Layered error definitions
//!
//! Categorized by source: config / acquisition / transport / storage / misuse

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Acquisition Errors =====
    /// Memory key could not be read
    #[error("could not get data in memory for the key '{key}': {message}")]
    KeyUnreachable { key: String, message: String },

    /// Value has no usable scalar type
    #[error("could not get a valid data type for key '{key}' ({found}); available types are: {available}")]
    UnrecognizedType {
        key: String,
        found: String,
        available: &'static str,
    },

    /// Value does not match the type the channel was wired with
    #[error("type mismatch for key '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    /// Conversion failed for another reason
    #[error("conversion error for '{channel}': {message}")]
    Conversion { channel: String, message: String },

    // ===== Transport Errors =====
    /// Delivery failed
    #[error("transport error on '{topic}': {message}")]
    Transport { topic: String, message: String },

    // ===== Storage Errors =====
    /// Durable log write/open/close error
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Storage budget exhausted
    #[error("no more space for durable logs: {used} bytes used, limit is {limit} bytes; remove existing logs to make new ones")]
    StorageExhausted { used: u64, limit: u64 },

    /// A durable log is already open
    #[error("a durable log is already open at '{location}'")]
    LogAlreadyOpen { location: String },

    /// No durable log is open
    #[error("no durable log is open")]
    LogNotOpen,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unreachable key error
    pub fn key_unreachable(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeyUnreachable {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create unrecognized type error
    pub fn unrecognized_type(key: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnrecognizedType {
            key: key.into(),
            found: found.into(),
            available: crate::DataType::available(),
        }
    }

    /// Create type mismatch error
    pub fn type_mismatch(
        key: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create conversion error
    pub fn conversion(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Whether the error belongs to the acquisition category
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            Self::KeyUnreachable { .. }
                | Self::UnrecognizedType { .. }
                | Self::TypeMismatch { .. }
                | Self::Conversion { .. }
        )
    }
}
