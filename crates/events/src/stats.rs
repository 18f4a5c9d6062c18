//! Event source metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Event source counters
#[derive(Debug, Default)]
pub struct EventMetrics {
    received: AtomicU64,
    published: AtomicU64,
    recorded: AtomicU64,
    buffered: AtomicU64,
    convert_failures: AtomicU64,
}

impl EventMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buffered(&self) {
        self.buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_convert_failure(&self) {
        self.convert_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EventMetricsSnapshot {
        EventMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            convert_failures: self.convert_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventMetricsSnapshot {
    pub received: u64,
    pub published: u64,
    pub recorded: u64,
    pub buffered: u64,
    pub convert_failures: u64,
}
