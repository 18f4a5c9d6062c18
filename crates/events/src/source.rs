//! EventSource - push-driven channel with its own buffer and flags

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    ChannelId, ContractError, PushCallback, PushEvent, PushSource, StampedMessage,
};
use sinks::{GlobalRecorder, PublishEndpoint, RollingBuffer};
use tracing::{debug, info, instrument, trace, warn};

use crate::stats::{EventMetrics, EventMetricsSnapshot};

/// Conversion of a push notification into a transport message
pub type EventConvert = Arc<dyn Fn(&PushEvent) -> Result<StampedMessage, ContractError> + Send + Sync>;

/// State shared with the capture callback
struct Shared {
    id: ChannelId,
    convert: EventConvert,
    publisher: Arc<PublishEndpoint>,
    recorder: Arc<GlobalRecorder>,
    publishing: AtomicBool,
    recording: AtomicBool,
    logging: AtomicBool,
    buffer: Mutex<RollingBuffer>,
    metrics: EventMetrics,
}

impl Shared {
    fn buffer(&self) -> MutexGuard<'_, RollingBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture path, runs on the acquisition layer's thread
    fn handle(&self, event: PushEvent) {
        self.metrics.record_received();
        metrics::counter!("robot_driver_event_messages_total", "event" => self.id.to_string())
            .increment(1);

        let message = match (self.convert)(&event) {
            Ok(message) => message,
            Err(e) => {
                self.metrics.record_convert_failure();
                warn!(event = %self.id, key = %event.key, error = %e, "event conversion failed");
                return;
            }
        };

        if self.publishing.load(Ordering::SeqCst) && self.publisher.is_subscribed() {
            self.publisher.publish(&message);
            self.metrics.record_published();
        }

        // Durable append happens before the buffer lock is taken
        if self.recording.load(Ordering::SeqCst) {
            match self.recorder.write(&message) {
                Ok(()) => self.metrics.record_recorded(),
                Err(e) => debug!(event = %self.id, error = %e, "event record skipped"),
            }
        }

        if self.logging.load(Ordering::SeqCst) {
            self.buffer().push(message);
            self.metrics.record_buffered();
        }
        trace!(event = %self.id, "event handled");
    }
}

/// Push-driven event source
///
/// Flags may be toggled from any thread while the capture path appends to the
/// buffer; the buffer is synchronized internally.
pub struct EventSource {
    source: Arc<dyn PushSource>,
    running: AtomicBool,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("id", &self.shared.id)
            .field("key", &self.source.key())
            .field("running", &self.is_running())
            .finish()
    }
}

impl EventSource {
    pub fn new(
        id: impl Into<ChannelId>,
        source: Arc<dyn PushSource>,
        convert: EventConvert,
        publisher: Arc<PublishEndpoint>,
        recorder: Arc<GlobalRecorder>,
        buffer_duration_s: f64,
    ) -> Self {
        Self {
            source,
            running: AtomicBool::new(false),
            shared: Arc::new(Shared {
                id: id.into(),
                convert,
                publisher,
                recorder,
                publishing: AtomicBool::new(false),
                recording: AtomicBool::new(false),
                logging: AtomicBool::new(true),
                buffer: Mutex::new(RollingBuffer::new(buffer_duration_s)),
                metrics: EventMetrics::new(),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> &ChannelId {
        &self.shared.id
    }

    /// Watched memory key
    pub fn key(&self) -> &str {
        self.source.key()
    }

    pub fn publisher(&self) -> &Arc<PublishEndpoint> {
        &self.shared.publisher
    }

    /// Start capturing; idempotent
    #[instrument(name = "event_start", skip(self), fields(event = %self.shared.id))]
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let callback: PushCallback = Arc::new(move |event| shared.handle(event));
        self.source.listen(callback);
        info!(event = %self.shared.id, key = %self.source.key(), "event source started");
    }

    /// Stop capturing; idempotent
    #[instrument(name = "event_stop", skip(self), fields(event = %self.shared.id))]
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.source.stop();
            info!(event = %self.shared.id, "event source stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_publishing(&self, publishing: bool) {
        self.shared.publishing.store(publishing, Ordering::SeqCst);
    }

    pub fn is_publishing(&self) -> bool {
        self.shared.publishing.load(Ordering::SeqCst)
    }

    pub fn set_recording(&self, recording: bool) {
        self.shared.recording.store(recording, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::SeqCst)
    }

    /// Enable or disable log buffering of captured messages
    pub fn set_logging(&self, logging: bool) {
        self.shared.logging.store(logging, Ordering::SeqCst);
    }

    /// Freeze (`true`) or thaw (`false`) the buffer
    pub fn set_dumping(&self, dumping: bool) {
        let evicted = self.shared.buffer().set_frozen(dumping);
        if evicted > 0 {
            debug!(event = %self.shared.id, evicted, "buffer thawed");
        }
    }

    pub fn is_dumping(&self) -> bool {
        self.shared.buffer().is_frozen()
    }

    pub fn set_buffer_duration(&self, duration_s: f64) {
        self.shared.buffer().set_duration(duration_s);
    }

    pub fn buffer_duration(&self) -> f64 {
        self.shared.buffer().duration()
    }

    pub fn buffer_len(&self) -> usize {
        self.shared.buffer().len()
    }

    /// Write buffered messages still inside the retention window at `time`
    /// into the open durable log
    ///
    /// Buffered messages stay in place and buffering goes on.
    #[instrument(name = "event_write_dump", skip(self), fields(event = %self.shared.id))]
    pub fn write_dump(&self, time: f64) -> Result<usize, ContractError> {
        let snapshot: Vec<StampedMessage> = {
            let buffer = self.shared.buffer();
            let cutoff = time - buffer.duration();
            buffer
                .snapshot()
                .into_iter()
                .filter(|m| !m.is_stamped() || m.stamp >= cutoff)
                .collect()
        };
        self.shared.recorder.write_all(&snapshot)
    }

    /// Run the capture path directly with `event`
    pub fn inject(&self, event: PushEvent) {
        self.shared.handle(event);
    }

    pub fn metrics(&self) -> EventMetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.stop();
    }
}
