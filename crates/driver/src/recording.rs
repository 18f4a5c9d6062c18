//! Recording controller
//!
//! Owns the durable-log lifecycle. Every operation here takes the recording
//! lock for its whole duration; the scheduling tick only ever tries that lock,
//! so a dump in progress makes ticks skip their Record action instead of
//! waiting. Lock order is registry, then recording. Starting and stopping a
//! session keep the registry locked until every endpoint has been
//! (un)subscribed, so a registration lands either before the session starts
//! or after it is fully set up. Channels registered during a session are not
//! part of it. Dumps clone the endpoints out and release the registry lock.

use std::sync::atomic::Ordering;

use contracts::{now_secs, ContractError};
use tokio::sync::MutexGuard;
use tracing::{info, instrument, warn};

use crate::driver::Driver;
use crate::error::DriverError;
use crate::registry::EndpointSnapshot;

/// State guarded by the recording lock
#[derive(Debug, Default)]
pub(crate) struct RecordingSession {
    /// Global record-enabled flag
    pub(crate) enabled: bool,
}

/// Result of a dump restricted to names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// Location of the written log
    Written(String),
    /// No name matched a channel or event source; no log was opened
    NothingMatched,
}

/// Result of a recording restricted to names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedRecording {
    /// Location of the opened log; `None` when nothing matched
    pub location: Option<String>,
    /// Names now being recorded
    pub matched: Vec<String>,
    /// Requested names that matched nothing
    pub unmatched: Vec<String>,
}

impl NamedRecording {
    /// Whether a log was opened
    pub fn is_started(&self) -> bool {
        self.location.is_some()
    }
}

fn subscribe_all(endpoints: &EndpointSnapshot, subscribed: bool) {
    for recorder in &endpoints.recorders {
        recorder.subscribe(subscribed);
    }
    for event in &endpoints.events {
        event.set_recording(subscribed);
    }
}

fn set_dumping(endpoints: &EndpointSnapshot, dumping: bool) {
    for recorder in &endpoints.recorders {
        recorder.set_dumping(dumping);
    }
    for event in &endpoints.events {
        event.set_dumping(dumping);
    }
}

fn endpoint_names(endpoints: &EndpointSnapshot) -> Vec<String> {
    endpoints
        .recorders
        .iter()
        .map(|r| r.id().to_string())
        .chain(endpoints.events.iter().map(|e| e.id().to_string()))
        .collect()
}

impl Driver {
    async fn endpoints(&self) -> EndpointSnapshot {
        self.shared.registry.lock().await.endpoints()
    }

    fn set_session(&self, session: &mut MutexGuard<'_, RecordingSession>, enabled: bool) {
        session.enabled = enabled;
        self.shared.recording_active.store(enabled, Ordering::SeqCst);
        observability::record_recording_active(enabled);
    }

    /// Refuse when the durable storage budget is used up
    fn check_capacity(&self) -> Result<(), DriverError> {
        let used = self.shared.storage.usage_bytes()?;
        let limit = self.shared.settings.max_folder_bytes;
        if used >= limit {
            warn!(used, limit, "durable storage budget exhausted");
            return Err(DriverError::InsufficientStorage { used, limit });
        }
        Ok(())
    }

    fn check_dump_allowed(&self) -> Result<(), DriverError> {
        if !self.is_logging() {
            warn!("dump refused: log buffering is disabled");
            return Err(DriverError::LoggingDisabled);
        }
        self.check_capacity()
    }

    /// Open a durable log and subscribe every record endpoint and event source
    #[instrument(name = "driver_start_recording", skip(self))]
    pub async fn start_recording(&self) -> Result<String, DriverError> {
        let registry = self.shared.registry.lock().await;
        let endpoints = registry.endpoints();
        let mut session = self.shared.recording.lock().await;
        if session.enabled {
            return Err(DriverError::RecordingActive);
        }
        self.check_capacity()?;

        let location = self
            .shared
            .recorder
            .start_record(&self.shared.settings.record_prefix)?;
        subscribe_all(&endpoints, true);
        self.set_session(&mut session, true);
        drop(registry);

        info!(
            location = %location,
            recorders = endpoints.recorders.len(),
            events = endpoints.events.len(),
            "recording started"
        );
        Ok(location)
    }

    /// Open a durable log for the named channels and event sources only
    ///
    /// Names matching nothing are reported back. When no name matches, no
    /// log is opened and the session stays idle.
    #[instrument(name = "driver_start_recording_named", skip(self, names), fields(requested = names.len()))]
    pub async fn start_recording_named(&self, names: &[String]) -> Result<NamedRecording, DriverError> {
        let registry = self.shared.registry.lock().await;
        let endpoints = registry.endpoints();
        let mut session = self.shared.recording.lock().await;
        if session.enabled {
            return Err(DriverError::RecordingActive);
        }
        self.check_capacity()?;

        let (selected, unmatched) = endpoints.select(names);
        if !unmatched.is_empty() {
            warn!(?unmatched, "names matched no channel or event source");
        }
        if selected.is_empty() {
            warn!("could not find any topic to record");
            return Ok(NamedRecording {
                location: None,
                matched: Vec::new(),
                unmatched,
            });
        }

        let location = self
            .shared
            .recorder
            .start_record(&self.shared.settings.record_prefix)?;
        subscribe_all(&selected, true);
        self.set_session(&mut session, true);
        drop(registry);

        let matched = endpoint_names(&selected);
        info!(location = %location, ?matched, "recording started");
        Ok(NamedRecording {
            location: Some(location),
            matched,
            unmatched,
        })
    }

    /// Unsubscribe everything and close the durable log
    #[instrument(name = "driver_stop_recording", skip(self))]
    pub async fn stop_recording(&self) -> Result<String, DriverError> {
        let registry = self.shared.registry.lock().await;
        let mut session = self.shared.recording.lock().await;
        if !session.enabled {
            return Err(DriverError::NotRecording);
        }
        self.set_session(&mut session, false);
        subscribe_all(&registry.endpoints(), false);
        drop(registry);

        let location = self.shared.recorder.stop_record()?;
        info!(location = %location, "recording stopped");
        Ok(location)
    }

    /// Snapshot every buffer into a fresh durable log tagged `prefix`
    ///
    /// An empty prefix falls back to the recording prefix.
    #[instrument(name = "driver_dump", skip(self), fields(prefix = %prefix))]
    pub async fn dump(&self, prefix: &str) -> Result<String, DriverError> {
        let result = match self.check_dump_allowed() {
            Ok(()) => {
                let all = self.endpoints().await;
                self.dump_endpoints(prefix, &all, &all).await
            }
            Err(e) => Err(e),
        };
        observability::record_dump(match &result {
            Ok(_) => "written",
            Err(e) => e.label(),
        });
        result
    }

    /// Snapshot only the named channels and event sources
    #[instrument(name = "driver_dump_named", skip(self, names), fields(prefix = %prefix, requested = names.len()))]
    pub async fn dump_named(&self, prefix: &str, names: &[String]) -> Result<DumpOutcome, DriverError> {
        if let Err(e) = self.check_dump_allowed() {
            observability::record_dump(e.label());
            return Err(e);
        }

        let all = self.endpoints().await;
        let (selected, unmatched) = all.select(names);
        if selected.is_empty() {
            warn!(?unmatched, "could not find any topic to dump");
            observability::record_dump("nothing_matched");
            return Ok(DumpOutcome::NothingMatched);
        }
        if !unmatched.is_empty() {
            warn!(?unmatched, "names matched no channel or event source");
        }

        let result = self.dump_endpoints(prefix, &all, &selected).await;
        observability::record_dump(match &result {
            Ok(_) => "written",
            Err(e) => e.label(),
        });
        result.map(DumpOutcome::Written)
    }

    /// Dump protocol, under the recording lock:
    /// interrupt an active session, freeze the selected buffers, write them
    /// into a fresh log, thaw, then restore the session
    async fn dump_endpoints(
        &self,
        prefix: &str,
        all: &EndpointSnapshot,
        selected: &EndpointSnapshot,
    ) -> Result<String, DriverError> {
        let prefix = if prefix.is_empty() {
            self.shared.settings.record_prefix.as_str()
        } else {
            prefix
        };
        let mut session = self.shared.recording.lock().await;

        let restore = if session.enabled {
            let subscribed = EndpointSnapshot {
                recorders: all.recorders.iter().filter(|r| r.is_subscribed()).cloned().collect(),
                events: all.events.iter().filter(|e| e.is_recording()).cloned().collect(),
            };
            self.set_session(&mut session, false);
            subscribe_all(&subscribed, false);
            match self.shared.recorder.stop_record() {
                Ok(location) => info!(location = %location, "recording interrupted by dump"),
                Err(e) => warn!(error = %e, "could not close recording before dump"),
            }
            Some(subscribed)
        } else {
            None
        };

        set_dumping(selected, true);
        let result = self.write_snapshot(prefix, selected);
        set_dumping(selected, false);

        let Some(subscribed) = restore else {
            return result;
        };
        match self
            .shared
            .recorder
            .start_record(&self.shared.settings.record_prefix)
        {
            Ok(location) => {
                subscribe_all(&subscribed, true);
                self.set_session(&mut session, true);
                info!(location = %location, "recording restored after dump");
                result
            }
            Err(source) => {
                warn!(error = %source, "could not restore recording after dump");
                match result {
                    Ok(dump) => Err(DriverError::RestoreFailed { dump, source }),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Write every selected buffer into a new log and close it
    ///
    /// The log is closed even when a write fails.
    fn write_snapshot(&self, prefix: &str, selected: &EndpointSnapshot) -> Result<String, DriverError> {
        let recorder = &self.shared.recorder;
        recorder.start_record(prefix)?;

        let time = now_secs();
        let mut written = 0;
        let outcome = (|| -> Result<(), ContractError> {
            for event in &selected.events {
                written += event.write_dump(time)?;
            }
            for record in &selected.recorders {
                written += record.write_dump(time)?;
            }
            Ok(())
        })();
        let closed = recorder.stop_record();

        match (outcome, closed) {
            (Ok(()), Ok(location)) => {
                info!(location = %location, written, "dump written");
                Ok(location)
            }
            (Err(e), _) | (Ok(()), Err(e)) => {
                warn!(error = %e, "dump failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::test_support::{harness, harness_with, Harness};
    use crate::driver::DriverSettings;
    use contracts::{DataType, LogStorage, Value};

    async fn sonar_and_bumper() -> Harness {
        let h = harness();
        h.memory.set("Sonar", Value::Float(0.5));
        h.memory.set("Bumper", Value::Float(0.0));
        h.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
        h.driver.register_dynamic_event("Bumper", DataType::None).await.unwrap();
        h.driver.start_events().await;
        h
    }

    #[tokio::test]
    async fn test_start_stop_round_trip() {
        let h = sonar_and_bumper().await;

        let location = h.driver.start_recording().await.unwrap();
        assert!(!location.is_empty());
        assert!(h.driver.is_recording());
        assert!(matches!(
            h.driver.start_recording().await,
            Err(DriverError::RecordingActive)
        ));

        assert_eq!(h.driver.stop_recording().await.unwrap(), location);
        assert!(!h.driver.is_recording());
        assert!(matches!(
            h.driver.stop_recording().await,
            Err(DriverError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn test_dump_refused_when_logging_disabled() {
        let h = sonar_and_bumper().await;
        h.driver.stop_logging().await;

        assert!(matches!(h.driver.dump("snap").await, Err(DriverError::LoggingDisabled)));
        assert_eq!(h.storage.opened_count(), 0);
    }

    #[tokio::test]
    async fn test_dump_refused_when_storage_full() {
        let mut settings = DriverSettings::default();
        settings.max_folder_bytes = 1000;
        let h = harness_with(settings);
        h.memory.set("Sonar", Value::Float(0.5));
        h.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
        h.storage.set_usage_bytes(5000);

        let err = h.driver.dump("snap").await.unwrap_err();
        assert!(matches!(err, DriverError::InsufficientStorage { used: 5000, limit: 1000 }));
        assert_eq!(h.storage.opened_count(), 0);
        assert!(!h.driver.is_recording());
        assert!(matches!(
            h.driver.start_recording().await,
            Err(DriverError::InsufficientStorage { .. })
        ));
    }

    #[tokio::test]
    async fn test_dump_writes_buffers_and_thaws() {
        let h = sonar_and_bumper().await;
        h.driver.tick().await;
        h.memory.raise_event("Bumper", Value::Float(1.0));

        let location = h.driver.dump("snap").await.unwrap();
        let messages = h.storage.messages(&location);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.topic == "Bumper"));
        assert!(messages.iter().any(|m| m.topic == "Sonar"));

        let frozen = h
            .driver
            .with_registry(|r| r.recorder("Sonar").map(|rec| rec.is_dumping()))
            .await;
        assert_eq!(frozen, Some(false));
        assert!(!h.driver.recorder().is_started());
    }

    #[tokio::test]
    async fn test_dump_restores_active_recording() {
        let h = sonar_and_bumper().await;
        let first = h.driver.start_recording().await.unwrap();

        let dump = h.driver.dump("snap").await.unwrap();
        assert_ne!(dump, first);
        assert!(h.driver.is_recording());
        let current = h.driver.recorder().location().unwrap();
        assert_ne!(current, first);
        assert_ne!(current, dump);
        assert_eq!(h.storage.opened_count(), 3);

        let subscribed = h
            .driver
            .with_registry(|r| r.recorder("Sonar").map(|rec| rec.is_subscribed()))
            .await;
        assert_eq!(subscribed, Some(true));
    }

    #[tokio::test]
    async fn test_dump_named_nothing_matched() {
        let h = sonar_and_bumper().await;
        let outcome = h
            .driver
            .dump_named("snap", &["camera".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome, DumpOutcome::NothingMatched);
        assert_eq!(h.storage.opened_count(), 0);
    }

    #[tokio::test]
    async fn test_dump_named_only_matching_channel() {
        let h = sonar_and_bumper().await;
        h.driver.tick().await;
        h.memory.raise_event("Bumper", Value::Float(1.0));

        let outcome = h
            .driver
            .dump_named("snap", &["Sonar".to_string(), "camera".to_string()])
            .await
            .unwrap();
        let DumpOutcome::Written(location) = outcome else {
            panic!("expected a written dump");
        };
        let messages = h.storage.messages(&location);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "Sonar");
        assert_eq!(h.storage.list().unwrap(), vec![location]);
    }

    #[tokio::test]
    async fn test_start_recording_named() {
        let h = sonar_and_bumper().await;

        let none = h
            .driver
            .start_recording_named(&["camera".to_string()])
            .await
            .unwrap();
        assert!(!none.is_started());
        assert_eq!(none.unmatched, vec!["camera"]);
        assert!(!h.driver.is_recording());
        assert_eq!(h.storage.opened_count(), 0);

        let started = h
            .driver
            .start_recording_named(&["Bumper".to_string(), "camera".to_string()])
            .await
            .unwrap();
        assert!(started.is_started());
        assert_eq!(started.matched, vec!["Bumper"]);
        let (sonar, bumper) = h
            .driver
            .with_registry(|r| {
                (
                    r.recorder("Sonar").map(|rec| rec.is_subscribed()),
                    r.event("Bumper").map(|e| e.is_recording()),
                )
            })
            .await;
        assert_eq!(sonar, Some(false));
        assert_eq!(bumper, Some(true));
    }
}
