//! PushSource trait - push-driven acquisition
//!
//! The acquisition layer notifies subscribers when a watched memory key
//! changes. Event sources attach a callback here instead of being polled by
//! the scheduler.

use std::sync::Arc;

use crate::Value;

/// Notification raised by the acquisition layer
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    /// Memory key that changed
    pub key: String,
    /// New value
    pub value: Value,
    /// Acquisition time (seconds since epoch)
    pub stamp: f64,
}

/// Push callback type
///
/// Invoked on the acquisition layer's own thread, never on the scheduler's.
pub type PushCallback = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// Push notification source for one memory key
///
/// # Example
///
/// ```ignore
/// let source: Arc<dyn PushSource> = memory.subscribe("RightBumperPressed");
/// source.listen(Arc::new(|event| {
///     println!("{} -> {}", event.key, event.value);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait PushSource: Send + Sync {
    /// Watched memory key
    fn key(&self) -> &str;

    /// Attach the callback and start delivering notifications
    ///
    /// Calling `listen` while already listening replaces nothing and is a no-op.
    fn listen(&self, callback: PushCallback);

    /// Stop delivering notifications; idempotent
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
