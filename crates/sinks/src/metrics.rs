//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single sink endpoint
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Current buffer length
    buffer_len: AtomicUsize,
    /// Total successful writes (publish deliveries or durable appends)
    write_count: AtomicU64,
    /// Total write failures
    failure_count: AtomicU64,
    /// Total messages kept by the rolling buffer
    buffered_count: AtomicU64,
    /// Total messages evicted from the rolling buffer
    evicted_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len.load(Ordering::Relaxed)
    }

    pub fn set_buffer_len(&self, len: usize) {
        self.buffer_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffered_count(&self) -> u64 {
        self.buffered_count.load(Ordering::Relaxed)
    }

    pub fn inc_buffered_count(&self) {
        self.buffered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted_count.load(Ordering::Relaxed)
    }

    pub fn add_evicted(&self, n: usize) {
        self.evicted_count.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffer_len: self.buffer_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            buffered_count: self.buffered_count(),
            evicted_count: self.evicted_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffer_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub buffered_count: u64,
    pub evicted_count: u64,
}
