//! MemoryLogStorage - in-process durable logs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, LogStorage, LogWriter, StampedMessage};

type Logs = Arc<Mutex<BTreeMap<String, Vec<StampedMessage>>>>;

fn lock(logs: &Logs) -> MutexGuard<'_, BTreeMap<String, Vec<StampedMessage>>> {
    logs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Log storage kept in memory, for tests and dry runs
///
/// Usage is reported as a fixed number of bytes per stored message unless
/// overridden with [`MemoryLogStorage::set_usage_bytes`].
#[derive(Debug, Default)]
pub struct MemoryLogStorage {
    logs: Logs,
    opened: AtomicUsize,
    usage_override: AtomicU64,
}

/// Bytes accounted per stored message
const BYTES_PER_MESSAGE: u64 = 64;

impl MemoryLogStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of logs ever opened
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Messages stored under `location` (empty if unknown)
    pub fn messages(&self, location: &str) -> Vec<StampedMessage> {
        lock(&self.logs).get(location).cloned().unwrap_or_default()
    }

    /// Report `bytes` as used storage; 0 restores the computed value
    pub fn set_usage_bytes(&self, bytes: u64) {
        self.usage_override.store(bytes, Ordering::SeqCst);
    }
}

impl LogStorage for MemoryLogStorage {
    fn open(&self, prefix: &str) -> Result<Box<dyn LogWriter>, ContractError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        let location = format!("memory://{prefix}_{n:04}");
        lock(&self.logs).insert(location.clone(), Vec::new());
        Ok(Box::new(MemoryLogWriter {
            location,
            logs: self.logs.clone(),
            count: 0,
        }))
    }

    fn usage_bytes(&self) -> Result<u64, ContractError> {
        let forced = self.usage_override.load(Ordering::SeqCst);
        if forced > 0 {
            return Ok(forced);
        }
        let messages: usize = lock(&self.logs).values().map(Vec::len).sum();
        Ok(messages as u64 * BYTES_PER_MESSAGE)
    }

    fn list(&self) -> Result<Vec<String>, ContractError> {
        Ok(lock(&self.logs).keys().cloned().collect())
    }

    fn remove(&self, location: &str) -> Result<(), ContractError> {
        lock(&self.logs)
            .remove(location)
            .map(|_| ())
            .ok_or_else(|| ContractError::storage(format!("{location} is not a stored log")))
    }

    fn is_managed(&self, location: &str) -> bool {
        lock(&self.logs).contains_key(location)
    }

    fn root(&self) -> String {
        "memory://".to_string()
    }
}

struct MemoryLogWriter {
    location: String,
    logs: Logs,
    count: usize,
}

impl LogWriter for MemoryLogWriter {
    fn location(&self) -> &str {
        &self.location
    }

    fn append(&mut self, message: &StampedMessage) -> Result<(), ContractError> {
        lock(&self.logs)
            .get_mut(&self.location)
            .ok_or_else(|| ContractError::storage(format!("{} was removed", self.location)))?
            .push(message.clone());
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }

    fn close(self: Box<Self>) -> Result<String, ContractError> {
        Ok(self.location)
    }
}
