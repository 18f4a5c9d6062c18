//! MemoryProxy trait - "fetch current value for key K"

use std::sync::Arc;

use crate::{ContractError, PushSource, Value};

/// Read access to the robot memory
///
/// Implementations decide latency and failure modes; callers never retry.
pub trait MemoryProxy: Send + Sync {
    /// Fetch the current value stored under `key`
    ///
    /// # Errors
    /// `ContractError::KeyUnreachable` when the key does not exist or the
    /// memory cannot be reached.
    fn get_data(&self, key: &str) -> Result<Value, ContractError>;

    /// Fetch several keys at once, failing on the first unreachable key
    fn get_list_data(&self, keys: &[String]) -> Result<Vec<Value>, ContractError> {
        keys.iter().map(|k| self.get_data(k)).collect()
    }

    /// Push source notifying every change of `key`
    ///
    /// Memories without change notifications keep the default, which refuses.
    fn watch(&self, key: &str) -> Result<Arc<dyn PushSource>, ContractError> {
        Err(ContractError::key_unreachable(key, "memory does not support change notifications"))
    }
}
