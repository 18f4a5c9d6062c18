//! Channel - converter plus action → callback table

use std::fmt;
use std::sync::Arc;

use contracts::{ActionKind, ActionSet, ChannelId, ContractError, StampedMessage};
use tracing::trace;

/// Sink callback bound to one action of one channel
pub type Callback = Arc<dyn Fn(&StampedMessage) + Send + Sync>;

/// Conversion step of a channel
///
/// Reads the acquisition source and builds the transport message. Called at
/// most once per tick, from the scheduling loop.
pub trait Converter: Send {
    /// Channel name
    fn name(&self) -> &str;

    /// Nominal frequency (Hz); 0 fires once
    fn frequency(&self) -> f64;

    /// Acquire and convert the current value
    fn convert(&mut self) -> Result<StampedMessage, ContractError>;

    /// Drop cached acquisition state (after a transport reset)
    fn reset(&mut self) {}
}

/// Fixed table from action kind to optional callback
#[derive(Clone, Default)]
pub struct CallbackTable {
    slots: [Option<Callback>; 3],
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `kind`, replacing any previous binding
    pub fn register(&mut self, kind: ActionKind, callback: Callback) {
        self.slots[kind.index()] = Some(callback);
    }

    #[inline]
    pub fn get(&self, kind: ActionKind) -> Option<&Callback> {
        self.slots[kind.index()].as_ref()
    }

    /// Actions this table can serve
    pub fn supported(&self) -> ActionSet {
        ActionKind::ALL
            .into_iter()
            .filter(|k| self.slots[k.index()].is_some())
            .collect()
    }
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("supported", &self.supported())
            .finish()
    }
}

/// Named unit of periodic work
pub struct Channel {
    id: ChannelId,
    frequency: f64,
    converter: Box<dyn Converter>,
    callbacks: CallbackTable,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("frequency", &self.frequency)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Channel {
    /// Wrap a converter; name and frequency come from the converter
    ///
    /// Negative or non-finite frequencies are clamped to 0 (one-shot).
    pub fn new(converter: Box<dyn Converter>) -> Self {
        let frequency = converter.frequency();
        let frequency = if frequency.is_finite() && frequency > 0.0 {
            frequency
        } else {
            0.0
        };
        Self {
            id: ChannelId::new(converter.name()),
            frequency,
            converter,
            callbacks: CallbackTable::new(),
        }
    }

    pub fn with_callback(mut self, kind: ActionKind, callback: Callback) -> Self {
        self.callbacks.register(kind, callback);
        self
    }

    #[inline]
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    #[inline]
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    #[inline]
    pub fn is_one_shot(&self) -> bool {
        self.frequency == 0.0
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }

    pub fn reset(&mut self) {
        self.converter.reset();
    }

    /// Convert once and fan out to every callback in `actions`
    ///
    /// Returns the actions actually dispatched (requested ∩ bound). An empty
    /// request does no conversion.
    pub fn call_all(&mut self, actions: ActionSet) -> Result<ActionSet, ContractError> {
        if actions.is_empty() {
            return Ok(ActionSet::empty());
        }

        let message = self.converter.convert()?;
        let mut dispatched = ActionSet::empty();
        for kind in actions.iter() {
            if let Some(callback) = self.callbacks.get(kind) {
                callback(&message);
                dispatched.insert(kind);
            }
        }
        trace!(channel = %self.id, ?dispatched, "channel dispatched");
        Ok(dispatched)
    }
}
