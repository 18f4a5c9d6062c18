//! RecordEndpoint - durable record and rolling log-buffer roles of a channel

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ChannelId, ContractError, StampedMessage};
use tracing::{debug, instrument, warn};

use crate::buffer::RollingBuffer;
use crate::metrics::SinkMetrics;
use crate::recorder::GlobalRecorder;

/// Rolling buffer plus its down-sampling counter
#[derive(Debug)]
struct BufferState {
    buffer: RollingBuffer,
    counter: u32,
    keep_every: u32,
}

/// Per-channel record endpoint
///
/// `write` appends to the shared durable log; `bufferize` feeds the rolling
/// buffer that a dump later drains.
#[derive(Debug)]
pub struct RecordEndpoint {
    id: ChannelId,
    recorder: Arc<GlobalRecorder>,
    subscribed: AtomicBool,
    state: Mutex<BufferState>,
    metrics: Arc<SinkMetrics>,
}

/// How many log-buffer actions share one kept sample
fn keep_every(channel_frequency: f64, buffer_frequency: f64) -> u32 {
    if channel_frequency <= 0.0 || buffer_frequency <= 0.0 {
        return 1;
    }
    (channel_frequency / buffer_frequency).round().max(1.0) as u32
}

impl RecordEndpoint {
    pub fn new(
        id: impl Into<ChannelId>,
        recorder: Arc<GlobalRecorder>,
        channel_frequency: f64,
        buffer_frequency: f64,
        buffer_duration_s: f64,
    ) -> Self {
        let keep_every = keep_every(channel_frequency, buffer_frequency);
        Self {
            id: id.into(),
            recorder,
            subscribed: AtomicBool::new(false),
            state: Mutex::new(BufferState {
                buffer: RollingBuffer::new(buffer_duration_s),
                counter: keep_every,
                keep_every,
            }),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    pub fn subscribe(&self, subscribed: bool) {
        self.subscribed.store(subscribed, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Append to the open durable log
    pub fn write(&self, message: &StampedMessage) {
        match self.recorder.write(message) {
            Ok(()) => self.metrics.inc_write_count(),
            Err(e) => {
                self.metrics.inc_failure_count();
                warn!(channel = %self.id, error = %e, "record write failed");
            }
        }
    }

    /// Feed the rolling buffer, keeping one sample every `keep_every` calls
    pub fn bufferize(&self, message: &StampedMessage) {
        let mut state = self.state();
        if state.counter < state.keep_every {
            state.counter += 1;
            return;
        }
        state.counter = 1;
        let evicted = state.buffer.push(message.clone());
        self.metrics.inc_buffered_count();
        self.metrics.add_evicted(evicted);
        self.metrics.set_buffer_len(state.buffer.len());
    }

    /// Write the buffered messages still inside the retention window at `time`
    ///
    /// The buffer is left intact; future buffering continues.
    #[instrument(name = "record_write_dump", skip(self), fields(channel = %self.id))]
    pub fn write_dump(&self, time: f64) -> Result<usize, ContractError> {
        let snapshot = {
            let state = self.state();
            let cutoff = time - state.buffer.duration();
            state
                .buffer
                .snapshot()
                .into_iter()
                .filter(|m| !m.is_stamped() || m.stamp >= cutoff)
                .collect::<Vec<_>>()
        };
        let written = self.recorder.write_all(&snapshot)?;
        debug!(channel = %self.id, written, "buffer dumped");
        Ok(written)
    }

    pub fn set_buffer_duration(&self, duration_s: f64) {
        self.state().buffer.set_duration(duration_s);
    }

    pub fn buffer_duration(&self) -> f64 {
        self.state().buffer.duration()
    }

    /// Freeze (`true`) or thaw (`false`) the rolling buffer
    pub fn set_dumping(&self, dumping: bool) {
        let mut state = self.state();
        let evicted = state.buffer.set_frozen(dumping);
        self.metrics.add_evicted(evicted);
        self.metrics.set_buffer_len(state.buffer.len());
    }

    pub fn is_dumping(&self) -> bool {
        self.state().buffer.is_frozen()
    }

    pub fn buffer_len(&self) -> usize {
        self.state().buffer.len()
    }

    /// Buffered messages, oldest first
    pub fn buffered(&self) -> Vec<StampedMessage> {
        self.state().buffer.snapshot()
    }
}
