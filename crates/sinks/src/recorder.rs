//! GlobalRecorder - the single shared durable-log handle

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, LogStorage, LogWriter, StampedMessage};
use tracing::{debug, info, instrument};

/// Shared handle to at most one open durable log
///
/// Record endpoints and event sources append through it from any thread; the
/// driver's recording lock decides who may open or close it.
pub struct GlobalRecorder {
    storage: Arc<dyn LogStorage>,
    writer: Mutex<Option<Box<dyn LogWriter>>>,
}

impl std::fmt::Debug for GlobalRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalRecorder")
            .field("root", &self.storage.root())
            .field("location", &self.location())
            .finish()
    }
}

impl GlobalRecorder {
    pub fn new(storage: Arc<dyn LogStorage>) -> Self {
        Self {
            storage,
            writer: Mutex::new(None),
        }
    }

    fn writer(&self) -> MutexGuard<'_, Option<Box<dyn LogWriter>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn storage(&self) -> &Arc<dyn LogStorage> {
        &self.storage
    }

    /// Open a new durable log
    ///
    /// # Errors
    /// `LogAlreadyOpen` if a log is open; the open log is left untouched.
    #[instrument(name = "recorder_start", skip(self))]
    pub fn start_record(&self, prefix: &str) -> Result<String, ContractError> {
        let mut slot = self.writer();
        if let Some(open) = slot.as_ref() {
            return Err(ContractError::LogAlreadyOpen {
                location: open.location().to_string(),
            });
        }
        let writer = self.storage.open(prefix)?;
        let location = writer.location().to_string();
        info!(location = %location, "durable log opened");
        *slot = Some(writer);
        Ok(location)
    }

    /// Close the open durable log and return its location
    #[instrument(name = "recorder_stop", skip(self))]
    pub fn stop_record(&self) -> Result<String, ContractError> {
        let writer = self.writer().take().ok_or(ContractError::LogNotOpen)?;
        let count = writer.len();
        let location = writer.close()?;
        info!(location = %location, messages = count, "durable log closed");
        Ok(location)
    }

    /// Append one message to the open log
    pub fn write(&self, message: &StampedMessage) -> Result<(), ContractError> {
        match self.writer().as_mut() {
            Some(writer) => writer.append(message),
            None => Err(ContractError::LogNotOpen),
        }
    }

    /// Append a batch under a single lock acquisition
    pub fn write_all(&self, messages: &[StampedMessage]) -> Result<usize, ContractError> {
        let mut slot = self.writer();
        let writer = slot.as_mut().ok_or(ContractError::LogNotOpen)?;
        for message in messages {
            writer.append(message)?;
        }
        debug!(count = messages.len(), "batch appended");
        Ok(messages.len())
    }

    pub fn is_started(&self) -> bool {
        self.writer().is_some()
    }

    /// Location of the open log
    pub fn location(&self) -> Option<String> {
        self.writer().as_ref().map(|w| w.location().to_string())
    }
}
