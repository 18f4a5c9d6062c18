//! Durable file management
//!
//! Listing and removal go through the storage collaborator, which refuses
//! anything outside its directory. The log currently open is never removed.

use tracing::{info, instrument, warn};

use crate::driver::Driver;
use crate::error::DriverError;

/// Outcome of a removal request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRemoval {
    pub removed: Vec<String>,
    /// (path, reason)
    pub refused: Vec<(String, String)>,
}

impl Driver {
    /// Durable logs in the storage directory, sorted
    pub fn list_files(&self) -> Result<Vec<String>, DriverError> {
        Ok(self.shared.storage.list()?)
    }

    /// Remove every durable log except the one being written
    #[instrument(name = "driver_remove_all_files", skip(self))]
    pub fn remove_all_files(&self) -> Result<FileRemoval, DriverError> {
        let files = self.list_files()?;
        let removal = self.remove_files(&files);
        info!(removed = removal.removed.len(), refused = removal.refused.len(), "durable logs cleaned");
        Ok(removal)
    }

    /// Remove the given durable logs
    ///
    /// Paths outside the storage directory, and the open log, are refused
    /// with a warning; the rest are removed.
    #[instrument(name = "driver_remove_files", skip(self, paths), fields(requested = paths.len()))]
    pub fn remove_files(&self, paths: &[String]) -> FileRemoval {
        let open = self.shared.recorder.location();
        let mut removal = FileRemoval::default();

        for path in paths {
            if open.as_deref() == Some(path.as_str()) {
                warn!(path = %path, "refusing to remove the open durable log");
                removal.refused.push((path.clone(), "log is being written".to_string()));
                continue;
            }
            match self.shared.storage.remove(path) {
                Ok(()) => removal.removed.push(path.clone()),
                Err(e) => {
                    warn!(path = %path, error = %e, "durable log not removed");
                    removal.refused.push((path.clone(), e.to_string()));
                }
            }
        }
        removal
    }
}
