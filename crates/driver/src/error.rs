//! Driver error types

use thiserror::Error;

/// Operator-facing driver errors
///
/// The `Display` text is what an operator sees when a command is refused.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Dump requested while log buffering is globally off
    #[error("log buffering is disabled; enable logging before dumping")]
    LoggingDisabled,

    /// Durable storage budget exceeded
    #[error("no more space left for durable logs: {used} bytes used for a limit of {limit} bytes; remove some logs before creating new ones")]
    InsufficientStorage { used: u64, limit: u64 },

    /// `start_recording` while a session is already active
    #[error("a recording session is already active; stop it first")]
    RecordingActive,

    /// `stop_recording` with no active session
    #[error("no recording session is active")]
    NotRecording,

    /// Name already taken by another channel or event source
    #[error("'{name}' is already registered as {role}")]
    DuplicateName { name: String, role: &'static str },

    /// The dump was written but the recording it interrupted could not be
    /// reopened; the session is left stopped
    #[error("dump written to {dump}, but the interrupted recording could not be restored: {source}")]
    RestoreFailed {
        dump: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Collaborator failure
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DriverError {
    /// Create a duplicate name error
    pub fn duplicate(name: impl Into<String>, role: &'static str) -> Self {
        Self::DuplicateName {
            name: name.into(),
            role,
        }
    }
}

impl DriverError {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            DriverError::LoggingDisabled => "logging_disabled",
            DriverError::InsufficientStorage { .. } => "insufficient_storage",
            DriverError::RecordingActive => "recording_active",
            DriverError::NotRecording => "not_recording",
            DriverError::DuplicateName { .. } => "duplicate_name",
            DriverError::RestoreFailed { .. } => "restore_failed",
            DriverError::Contract(_) => "collaborator",
        }
    }
}
