//! MemoryTransport - records deliveries in memory

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, StampedMessage, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory transport with controllable listeners
#[derive(Debug, Default)]
pub struct MemoryTransport {
    name: String,
    listeners: Mutex<HashSet<String>>,
    delivered: Mutex<Vec<StampedMessage>>,
    failing: AtomicBool,
}

impl MemoryTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_listener(&self, topic: impl Into<String>) {
        lock(&self.listeners).insert(topic.into());
    }

    pub fn remove_listener(&self, topic: &str) {
        lock(&self.listeners).remove(topic);
    }

    /// Make every delivery fail (connection lost)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every delivered message, in order
    pub fn delivered(&self) -> Vec<StampedMessage> {
        lock(&self.delivered).clone()
    }

    /// Messages delivered on `topic`
    pub fn delivered_on(&self, topic: &str) -> Vec<StampedMessage> {
        lock(&self.delivered)
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_listener(&self, topic: &str) -> bool {
        lock(&self.listeners).contains(topic)
    }

    fn deliver(&self, message: &StampedMessage) -> Result<(), ContractError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ContractError::transport(&message.topic, "transport is down"));
        }
        lock(&self.delivered).push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Payload;

    #[test]
    fn test_listeners_and_deliveries() {
        let transport = MemoryTransport::new("mem");
        assert!(!transport.has_listener("odom"));
        transport.add_listener("odom");
        assert!(transport.has_listener("odom"));

        let msg = StampedMessage::new("odom", 1.0, Payload::Int { data: 1 });
        transport.deliver(&msg).unwrap();
        assert_eq!(transport.delivered_on("odom").len(), 1);

        transport.set_failing(true);
        assert!(transport.deliver(&msg).is_err());
        assert_eq!(transport.delivered().len(), 1);
    }
}
