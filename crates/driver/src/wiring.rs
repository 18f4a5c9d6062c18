//! Wiring of concrete channels and event sources
//!
//! Builds converters from the acquisition layer, pairs them with sink
//! endpoints on the current transport and recorder, and registers them.
//! Covers boot-time wiring from the configuration as well as dynamic
//! registration requested by an operator.

use std::path::Path;
use std::sync::Arc;

use acquisition::{probe_type, scalar_payload, InfoConverter, MemoryConverter, MemoryListConverter};
use config_loader::INFO_CHANNEL_NAME;
use contracts::{ContractError, DataType, DriverConfig, PushEvent, StampedMessage};
use events::{EventConvert, EventSource};
use scheduler::{Channel, Converter};
use sinks::PublishEndpoint;
use tracing::{info, instrument, warn};

use crate::driver::Driver;
use crate::error::DriverError;

/// What boot wiring registered and what it skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WiringReport {
    pub channels: Vec<String>,
    pub events: Vec<String>,
    /// (name, reason) of entries that could not be wired
    pub skipped: Vec<(String, String)>,
}

/// Which sink endpoints a wired channel gets
#[derive(Debug, Clone, Copy)]
struct Sinks {
    publish: bool,
    latched: bool,
    record: bool,
}

impl Sinks {
    const ALL: Sinks = Sinks {
        publish: true,
        latched: false,
        record: true,
    };
}

impl Driver {
    /// Wire the info channel, channels and events of `config`
    ///
    /// Entries that cannot be wired are skipped with a warning. Publishing is
    /// switched on afterwards when the configuration asks for it.
    #[instrument(
        name = "driver_wire",
        skip(self, config),
        fields(channels = config.channels.len(), events = config.events.len())
    )]
    pub async fn wire(&self, config: &DriverConfig) -> WiringReport {
        let mut report = WiringReport::default();

        if config.info.enabled {
            match self.add_info_channel(&config.info.keys).await {
                Ok(()) => report.channels.push(INFO_CHANNEL_NAME.to_string()),
                Err(e) => skip(&mut report, INFO_CHANNEL_NAME, e),
            }
        }

        for channel in config.enabled_channels() {
            let data_type = match self.resolve_type(&channel.key, channel.data_type) {
                Ok(data_type) => data_type,
                Err(e) => {
                    skip(&mut report, &channel.name, e);
                    continue;
                }
            };
            let sinks = Sinks {
                publish: channel.publish,
                latched: false,
                record: channel.record,
            };
            let converter = MemoryConverter::new(
                &channel.name,
                &channel.key,
                channel.frequency_hz,
                data_type,
                Arc::clone(self.memory()),
            );
            match self.add_channel(Box::new(converter), sinks).await {
                Ok(()) => report.channels.push(channel.name.clone()),
                Err(e) => skip(&mut report, &channel.name, e),
            }
        }

        for event in config.enabled_events() {
            let result = match self.resolve_type(&event.key, event.data_type) {
                Ok(data_type) => self.add_event(&event.name, &event.key, data_type).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.events.push(event.name.clone()),
                Err(e) => skip(&mut report, &event.name, e),
            }
        }

        if self.settings().publish_on_start {
            self.start_publishing().await;
        }

        info!(
            channels = report.channels.len(),
            events = report.events.len(),
            skipped = report.skipped.len(),
            "driver wired"
        );
        report
    }

    /// Explicit types are trusted; `None` probes the key
    fn resolve_type(&self, key: &str, hint: DataType) -> Result<DataType, DriverError> {
        if hint != DataType::None {
            return Ok(hint);
        }
        Ok(probe_type(self.memory().as_ref(), key, hint)?)
    }

    /// Probe `key` and wire a polled channel publishing and recording it
    ///
    /// The channel and its topic are named after the key.
    ///
    /// # Errors
    /// `KeyUnreachable` or `UnrecognizedType` from the probe; nothing is
    /// registered in that case.
    #[instrument(name = "driver_register_dynamic_channel", skip(self))]
    pub async fn register_dynamic_channel(
        &self,
        key: &str,
        frequency: f64,
        hint: DataType,
    ) -> Result<(), DriverError> {
        let data_type = probe_type(self.memory().as_ref(), key, hint).inspect_err(|e| {
            warn!(key = %key, error = %e, "dynamic channel refused");
        })?;
        let converter = MemoryConverter::new(key, key, frequency, data_type, Arc::clone(self.memory()));
        self.add_channel(Box::new(converter), Sinks::ALL).await?;
        info!(key = %key, frequency, data_type = %data_type, "dynamic channel registered");
        Ok(())
    }

    /// Probe `key` and wire an event source on it
    #[instrument(name = "driver_register_dynamic_event", skip(self))]
    pub async fn register_dynamic_event(&self, key: &str, hint: DataType) -> Result<(), DriverError> {
        let data_type = probe_type(self.memory().as_ref(), key, hint).inspect_err(|e| {
            warn!(key = %key, error = %e, "dynamic event refused");
        })?;
        self.add_event(key, key, data_type).await?;
        info!(key = %key, data_type = %data_type, "dynamic event registered");
        Ok(())
    }

    /// Wire a memory-list channel described by a JSON file
    ///
    /// Returns the channel's topic.
    #[instrument(name = "driver_add_memory_channels", skip(self), fields(path = %path.display()))]
    pub async fn add_memory_channels(&self, path: &Path) -> Result<String, DriverError> {
        let spec = config_loader::load_memory_list(path).inspect_err(|e| {
            warn!(error = %e, "memory list refused");
        })?;
        let converter = MemoryListConverter::new(
            &spec.topic,
            spec.keys.clone(),
            spec.frequency_hz,
            Arc::clone(self.memory()),
        );
        self.add_channel(Box::new(converter), Sinks::ALL).await?;
        info!(topic = %spec.topic, keys = spec.keys.len(), frequency = spec.frequency_hz, "memory list channel registered");
        Ok(spec.topic)
    }

    /// Wire the one-shot robot info channel on a latched topic
    pub async fn add_info_channel(&self, keys: &[String]) -> Result<(), DriverError> {
        let converter = InfoConverter::new(INFO_CHANNEL_NAME, keys.to_vec(), Arc::clone(self.memory()));
        let sinks = Sinks {
            publish: true,
            latched: true,
            record: true,
        };
        self.add_channel(Box::new(converter), sinks).await
    }

    async fn add_channel(&self, converter: Box<dyn Converter>, sinks: Sinks) -> Result<(), DriverError> {
        let channel = Channel::new(converter);
        let name = channel.id().to_string();

        let publisher = sinks.publish.then(|| {
            let endpoint = PublishEndpoint::new(name.as_str(), name.as_str(), self.transport());
            Arc::new(if sinks.latched {
                endpoint.latched()
            } else {
                endpoint
            })
        });
        let recorder = sinks
            .record
            .then(|| self.record_endpoint(&name, channel.frequency()));

        self.register(channel, publisher, recorder).await?;
        Ok(())
    }

    /// Build and register an event source watching `key`
    async fn add_event(&self, name: &str, key: &str, data_type: DataType) -> Result<(), DriverError> {
        let source = self.memory().watch(key)?;
        let topic = name.to_string();
        let convert: EventConvert = Arc::new(move |event: &PushEvent| -> Result<StampedMessage, ContractError> {
            let payload = scalar_payload(&event.key, &event.value, data_type)?;
            Ok(StampedMessage::new(topic.as_str(), event.stamp, payload))
        });

        let event = EventSource::new(
            name,
            source,
            convert,
            self.publish_endpoint(name),
            Arc::clone(self.recorder()),
            self.buffer_duration(),
        );
        self.register_event(Arc::new(event)).await
    }
}

fn skip(report: &mut WiringReport, name: &str, error: DriverError) {
    warn!(name = %name, error = %error, "entry skipped");
    report.skipped.push((name.to_string(), error.to_string()));
}
