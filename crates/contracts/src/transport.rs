//! Transport traits - "deliver message M on channel C" and "C has a listener"

use std::sync::Arc;

use crate::{ContractError, StampedMessage};

/// Outbound message transport
pub trait Transport: Send + Sync {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// Whether `topic` currently has at least one active listener
    fn has_listener(&self, topic: &str) -> bool;

    /// Deliver a message on its topic
    ///
    /// # Errors
    /// Returns a transport error; the caller drops the message.
    fn deliver(&self, message: &StampedMessage) -> Result<(), ContractError>;
}

/// Anything holding a handle to the transport that must follow a reconnect
///
/// Implemented by publish endpoints, inbound subscribers and
/// remote-procedure services.
pub trait TransportBinding: Send + Sync {
    /// Unique name within its role
    fn name(&self) -> &str;

    /// Swap the transport handle, keeping all other state
    fn rebind(&self, transport: Arc<dyn Transport>);
}
