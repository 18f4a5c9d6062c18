//! Registry - name-indexed channels, sink endpoints, event sources and bindings
//!
//! Channels live in an arena of stable indices; the work queue references
//! those indices. Sink endpoints and event sources are keyed by channel name.
//! The whole registry sits behind the driver's registry lock together with the
//! queue, so a tick and a mutation never interleave.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use contracts::{ActionKind, ChannelId, StampedMessage, Transport, TransportBinding};
use events::EventSource;
use scheduler::{Channel, WorkQueue};
use sinks::{PublishEndpoint, RecordEndpoint};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::DriverError;

/// Sink endpoints of the registry, cloned out for recording operations
#[derive(Debug, Clone, Default)]
pub struct EndpointSnapshot {
    pub recorders: Vec<Arc<RecordEndpoint>>,
    pub events: Vec<Arc<EventSource>>,
}

impl EndpointSnapshot {
    /// Keep only the entries named in `names`
    ///
    /// Returns the filtered snapshot and the names that matched nothing.
    pub fn select(&self, names: &[String]) -> (EndpointSnapshot, Vec<String>) {
        let mut selected = EndpointSnapshot::default();
        let mut unmatched = Vec::new();
        for name in names {
            let mut found = false;
            if let Some(rec) = self.recorders.iter().find(|r| r.id() == name) {
                selected.recorders.push(Arc::clone(rec));
                found = true;
            }
            if let Some(event) = self.events.iter().find(|e| e.id() == name) {
                selected.events.push(Arc::clone(event));
                found = true;
            }
            if !found {
                unmatched.push(name.clone());
            }
        }
        (selected, unmatched)
    }

    /// No record endpoint and no event source
    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty() && self.events.is_empty()
    }
}

/// Registry of everything the driver schedules or dispatches to
#[derive(Default)]
pub struct Registry {
    /// Channel arena; indices are stable until `unregister_all`
    channels: Vec<Channel>,
    /// name -> arena index
    names: HashMap<ChannelId, usize>,
    queue: WorkQueue,
    publishers: BTreeMap<ChannelId, Arc<PublishEndpoint>>,
    recorders: BTreeMap<ChannelId, Arc<RecordEndpoint>>,
    events: BTreeMap<ChannelId, Arc<EventSource>>,
    subscribers: BTreeMap<String, Arc<dyn TransportBinding>>,
    services: BTreeMap<String, Arc<dyn TransportBinding>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.channels.len())
            .field("queued", &self.queue.len())
            .field("publishers", &self.publishers.len())
            .field("recorders", &self.recorders.len())
            .field("events", &self.events.len())
            .field("subscribers", &self.subscribers.len())
            .field("services", &self.services.len())
            .finish()
    }
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(&self, name: &ChannelId) -> Result<(), DriverError> {
        if self.names.contains_key(name) {
            return Err(DriverError::duplicate(name.as_str(), "channel"));
        }
        if self.events.contains_key(name) {
            return Err(DriverError::duplicate(name.as_str(), "event"));
        }
        if self.publishers.contains_key(name) {
            return Err(DriverError::duplicate(name.as_str(), "publish endpoint"));
        }
        if self.recorders.contains_key(name) {
            return Err(DriverError::duplicate(name.as_str(), "record endpoint"));
        }
        Ok(())
    }

    /// Register a channel with optional sink endpoints
    ///
    /// Binds the channel's callback table to the given endpoints, assigns the
    /// next arena index and queues the channel due at `now`.
    #[instrument(
        name = "registry_register",
        skip(self, channel, publisher, recorder, now),
        fields(channel = %channel.id(), frequency = channel.frequency())
    )]
    pub fn register(
        &mut self,
        mut channel: Channel,
        publisher: Option<Arc<PublishEndpoint>>,
        recorder: Option<Arc<RecordEndpoint>>,
        now: Instant,
    ) -> Result<usize, DriverError> {
        let id = channel.id().clone();
        self.check_name(&id)?;

        if let Some(publisher) = &publisher {
            let publisher = Arc::clone(publisher);
            channel
                .callbacks_mut()
                .register(ActionKind::Publish, Arc::new(move |m: &StampedMessage| publisher.publish(m)));
        }
        if let Some(recorder) = &recorder {
            let record = Arc::clone(recorder);
            channel
                .callbacks_mut()
                .register(ActionKind::Record, Arc::new(move |m: &StampedMessage| record.write(m)));
            let buffer = Arc::clone(recorder);
            channel
                .callbacks_mut()
                .register(ActionKind::LogBuffer, Arc::new(move |m: &StampedMessage| buffer.bufferize(m)));
        }

        let index = self.channels.len();
        self.channels.push(channel);
        self.names.insert(id.clone(), index);
        self.queue.push(now, index);

        if let Some(publisher) = publisher {
            self.publishers.insert(id.clone(), publisher);
        }
        if let Some(recorder) = recorder {
            self.recorders.insert(id.clone(), recorder);
        }

        debug!(channel = %id, index, "channel registered");
        Ok(index)
    }

    /// Register a channel that only publishes
    pub fn register_publish_only(
        &mut self,
        channel: Channel,
        publisher: Arc<PublishEndpoint>,
        now: Instant,
    ) -> Result<usize, DriverError> {
        self.register(channel, Some(publisher), None, now)
    }

    /// Register a channel that only records and buffers
    pub fn register_record_only(
        &mut self,
        channel: Channel,
        recorder: Arc<RecordEndpoint>,
        now: Instant,
    ) -> Result<usize, DriverError> {
        self.register(channel, None, Some(recorder), now)
    }

    /// Register an event source under its own name
    #[instrument(name = "registry_register_event", skip(self, event), fields(event = %event.id()))]
    pub fn register_event(&mut self, event: Arc<EventSource>) -> Result<(), DriverError> {
        let id = event.id().clone();
        self.check_name(&id)?;
        self.events.insert(id.clone(), event);
        debug!(event = %id, "event registered");
        Ok(())
    }

    /// Register an inbound subscriber; a name already present is kept
    pub fn register_subscriber(&mut self, binding: Arc<dyn TransportBinding>) -> bool {
        insert_binding(&mut self.subscribers, binding, "subscriber")
    }

    /// Register a remote-procedure service; a name already present is kept
    pub fn register_service(&mut self, binding: Arc<dyn TransportBinding>) -> bool {
        insert_binding(&mut self.services, binding, "service")
    }

    /// Stop every event source, then clear every collection
    ///
    /// Idempotent.
    #[instrument(name = "registry_unregister_all", skip(self))]
    pub fn unregister_all(&mut self) {
        if self.is_empty() {
            return;
        }
        for event in self.events.values() {
            event.stop();
        }
        let channels = self.channels.len();
        let events = self.events.len();

        self.queue.clear();
        self.channels.clear();
        self.names.clear();
        self.publishers.clear();
        self.recorders.clear();
        self.events.clear();
        self.subscribers.clear();
        self.services.clear();

        info!(channels, events, "registry cleared");
    }

    /// Rebind every publish endpoint, event publisher, subscriber and service
    /// to `transport`
    ///
    /// Channels, queue entries and buffered history stay in place. Returns the
    /// number of rebound bindings.
    #[instrument(name = "registry_reset_bindings", skip(self, transport), fields(transport = %transport.name()))]
    pub fn reset_bindings(&mut self, transport: &Arc<dyn Transport>) -> usize {
        let mut rebound = 0;
        for publisher in self.publishers.values() {
            publisher.rebind(Arc::clone(transport));
            rebound += 1;
        }
        for event in self.events.values() {
            event.publisher().rebind(Arc::clone(transport));
            rebound += 1;
        }
        for binding in self.subscribers.values().chain(self.services.values()) {
            binding.rebind(Arc::clone(transport));
            rebound += 1;
        }
        for channel in &mut self.channels {
            channel.reset();
        }
        info!(rebound, "bindings reset");
        rebound
    }

    /// No channel, event source, subscriber or service registered
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
            && self.events.is_empty()
            && self.subscribers.is_empty()
            && self.services.is_empty()
    }

    /// Scheduling queue over channel indices
    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Mutable queue, for the tick's pop and re-arm
    pub fn queue_mut(&mut self) -> &mut WorkQueue {
        &mut self.queue
    }

    /// Channel at an arena index
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Mutable channel at an arena index; conversions need `&mut`
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// Arena index of a channel
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Number of registered channels, dormant ones included
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of registered event sources
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Publish endpoint of a channel
    pub fn publisher(&self, name: &str) -> Option<&Arc<PublishEndpoint>> {
        self.publishers.get(name)
    }

    /// Record endpoint of a channel
    pub fn recorder(&self, name: &str) -> Option<&Arc<RecordEndpoint>> {
        self.recorders.get(name)
    }

    /// Event source by name
    pub fn event(&self, name: &str) -> Option<&Arc<EventSource>> {
        self.events.get(name)
    }

    /// Event sources in name order
    pub fn events(&self) -> impl Iterator<Item = &Arc<EventSource>> {
        self.events.values()
    }

    /// Record endpoints in name order
    pub fn recorders(&self) -> impl Iterator<Item = &Arc<RecordEndpoint>> {
        self.recorders.values()
    }

    /// Record endpoints and event sources, cloned out of the lock
    pub fn endpoints(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            recorders: self.recorders.values().cloned().collect(),
            events: self.events.values().cloned().collect(),
        }
    }

    /// Names of every channel and event source, sorted
    pub fn available_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .keys()
            .chain(self.events.keys())
            .map(|id| id.to_string())
            .collect();
        names.sort();
        names
    }

    /// Topics of the publish endpoints that currently have a consumer, sorted
    ///
    /// Covers channel publishers and event-source publishers alike.
    pub fn subscribed_publishers(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .publishers
            .values()
            .chain(self.events.values().map(|e| e.publisher()))
            .filter(|p| p.is_subscribed())
            .map(|p| p.topic().to_string())
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }
}

fn insert_binding(
    map: &mut BTreeMap<String, Arc<dyn TransportBinding>>,
    binding: Arc<dyn TransportBinding>,
    role: &'static str,
) -> bool {
    let name = binding.name().to_string();
    if map.contains_key(&name) {
        debug!(name = %name, role, "binding already registered");
        return false;
    }
    map.insert(name, binding);
    true
}
