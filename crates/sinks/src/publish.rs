//! PublishEndpoint - live publish role of a channel

use std::sync::{Arc, PoisonError, RwLock};

use contracts::{ChannelId, StampedMessage, Transport, TransportBinding};
use tracing::{info, warn};

use crate::metrics::SinkMetrics;

/// Per-channel publish endpoint bound to a transport topic
pub struct PublishEndpoint {
    id: ChannelId,
    topic: String,
    /// Always counts as subscribed (one-shot values must reach late listeners)
    latched: bool,
    transport: RwLock<Arc<dyn Transport>>,
    metrics: Arc<SinkMetrics>,
}

impl std::fmt::Debug for PublishEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishEndpoint")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("latched", &self.latched)
            .finish()
    }
}

impl PublishEndpoint {
    pub fn new(id: impl Into<ChannelId>, topic: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            latched: false,
            transport: RwLock::new(transport),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn latched(mut self) -> Self {
        self.latched = true;
        self
    }

    fn transport(&self) -> Arc<dyn Transport> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[inline]
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Whether publishing on this topic currently reaches anyone
    pub fn is_subscribed(&self) -> bool {
        self.latched || self.transport().has_listener(&self.topic)
    }

    /// Deliver on the bound topic; failures are logged and counted
    pub fn publish(&self, message: &StampedMessage) {
        match self.transport().deliver(message) {
            Ok(()) => self.metrics.inc_write_count(),
            Err(e) => {
                self.metrics.inc_failure_count();
                warn!(channel = %self.id, topic = %self.topic, error = %e, "publish failed");
            }
        }
    }
}

impl TransportBinding for PublishEndpoint {
    fn name(&self) -> &str {
        &self.id
    }

    fn rebind(&self, transport: Arc<dyn Transport>) {
        info!(channel = %self.id, transport = %transport.name(), "publisher rebound");
        *self.transport.write().unwrap_or_else(PoisonError::into_inner) = transport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTransport;
    use contracts::Payload;

    fn msg() -> StampedMessage {
        StampedMessage::new("battery", 1.0, Payload::Float { data: 0.7 })
    }

    #[test]
    fn test_subscription_follows_listener() {
        let transport = Arc::new(MemoryTransport::new("a"));
        let ep = PublishEndpoint::new("battery", "battery", transport.clone());
        assert!(!ep.is_subscribed());
        transport.add_listener("battery");
        assert!(ep.is_subscribed());
    }

    #[test]
    fn test_latched_is_always_subscribed() {
        let transport = Arc::new(MemoryTransport::new("a"));
        let ep = PublishEndpoint::new("info", "info", transport).latched();
        assert!(ep.is_subscribed());
    }

    #[test]
    fn test_rebind_switches_transport() {
        let first = Arc::new(MemoryTransport::new("first"));
        let second = Arc::new(MemoryTransport::new("second"));
        let ep = PublishEndpoint::new("battery", "battery", first.clone());

        ep.publish(&msg());
        ep.rebind(second.clone());
        ep.publish(&msg());

        assert_eq!(first.delivered().len(), 1);
        assert_eq!(second.delivered().len(), 1);
        assert_eq!(ep.metrics().write_count(), 2);
    }

    #[test]
    fn test_publish_failure_is_counted() {
        let transport = Arc::new(MemoryTransport::new("a"));
        transport.set_failing(true);
        let ep = PublishEndpoint::new("battery", "battery", transport);
        ep.publish(&msg());
        assert_eq!(ep.metrics().failure_count(), 1);
    }
}
