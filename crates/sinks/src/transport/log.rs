//! LogTransport - logs message summaries via tracing

use std::collections::HashSet;

use contracts::{ContractError, Payload, StampedMessage, Transport};
use tracing::{debug, info};

/// Transport that logs every delivered message
///
/// Topics listed at construction count as having a listener; with no list,
/// every topic does.
#[derive(Debug)]
pub struct LogTransport {
    name: String,
    listeners: Option<HashSet<String>>,
}

impl LogTransport {
    /// Every topic has a listener
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: None,
        }
    }

    /// Only the given topics have a listener
    pub fn with_listeners<I, S>(name: impl Into<String>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            listeners: Some(topics.into_iter().map(Into::into).collect()),
        }
    }

    fn summary(payload: &Payload) -> String {
        match payload {
            Payload::Float { data } => data.to_string(),
            Payload::Int { data } => data.to_string(),
            Payload::Text { data } => data.clone(),
            Payload::Bool { data } => data.to_string(),
            Payload::MemoryList { entries } => format!("{} entries", entries.len()),
            Payload::Image(image) => format!("{}x{} {:?}", image.width, image.height, image.format),
            Payload::JointState(joints) => format!("{} joints", joints.names.len()),
            Payload::Raw { data } => format!("{} bytes", data.len()),
        }
    }
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_listener(&self, topic: &str) -> bool {
        self.listeners
            .as_ref()
            .map_or(true, |topics| topics.contains(topic))
    }

    fn deliver(&self, message: &StampedMessage) -> Result<(), ContractError> {
        match &message.payload {
            // Bulky payloads only at debug
            Payload::Image(_) | Payload::Raw { .. } => debug!(
                transport = %self.name,
                topic = %message.topic,
                stamp = message.stamp,
                kind = message.payload.kind(),
                value = %Self::summary(&message.payload),
                "message delivered"
            ),
            _ => info!(
                transport = %self.name,
                topic = %message.topic,
                stamp = message.stamp,
                kind = message.payload.kind(),
                value = %Self::summary(&message.payload),
                "message delivered"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_filter() {
        let all = LogTransport::new("log");
        assert!(all.has_listener("anything"));

        let some = LogTransport::with_listeners("log", ["battery"]);
        assert!(some.has_listener("battery"));
        assert!(!some.has_listener("sonar"));
    }

    #[test]
    fn test_deliver() {
        let transport = LogTransport::new("log");
        let msg = StampedMessage::new("battery", 1.0, Payload::Float { data: 0.9 });
        assert!(transport.deliver(&msg).is_ok());
        assert_eq!(transport.name(), "log");
    }
}
