//! Durable log storage traits - "open / append / close"

use crate::{ContractError, StampedMessage};

/// Durable log storage
///
/// Owns a directory-like namespace of log files; at most one writer is
/// opened at a time by the driver.
pub trait LogStorage: Send + Sync {
    /// Open a new durable log whose name starts with `prefix`
    fn open(&self, prefix: &str) -> Result<Box<dyn LogWriter>, ContractError>;

    /// Bytes currently used by stored logs
    fn usage_bytes(&self) -> Result<u64, ContractError>;

    /// Stored log locations, sorted
    fn list(&self) -> Result<Vec<String>, ContractError>;

    /// Remove one stored log
    ///
    /// # Errors
    /// Refuses locations that are not managed by this storage.
    fn remove(&self, location: &str) -> Result<(), ContractError>;

    /// Whether `location` is a log owned by this storage
    fn is_managed(&self, location: &str) -> bool;

    /// Human-readable root of the namespace (directory path)
    fn root(&self) -> String;
}

/// One open durable log
pub trait LogWriter: Send {
    /// Final location of the log
    fn location(&self) -> &str;

    /// Append a message with its stamp
    fn append(&mut self, message: &StampedMessage) -> Result<(), ContractError>;

    /// Number of messages appended so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush and close, returning the location
    fn close(self: Box<Self>) -> Result<String, ContractError>;
}
