//! Rolling message buffer with stamp-based retention.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (stamp + slab key)
//! - Slab stores the actual StampedMessage
//!
//! Eviction is relative to the newest stamp seen and happens on append only.
//! While frozen, appends are parked in a side queue and merged on thaw so a
//! snapshot taken in between stays consistent.

use std::fmt;

use contracts::StampedMessage;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

const INITIAL_CAPACITY: usize = 64;

/// Lightweight metadata stored in ring buffer
#[derive(Debug, Clone, Copy)]
struct MessageMeta {
    stamp: f64,
    slab_key: usize,
}

/// Time-bounded message buffer
pub struct RollingBuffer {
    index: HeapRb<MessageMeta>,
    storage: Slab<StampedMessage>,
    duration_s: f64,
    newest: Option<f64>,
    frozen: bool,
    pending: Vec<StampedMessage>,
    evicted_count: u64,
}

impl fmt::Debug for RollingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingBuffer")
            .field("len", &self.index.occupied_len())
            .field("duration_s", &self.duration_s)
            .field("frozen", &self.frozen)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl RollingBuffer {
    pub fn new(duration_s: f64) -> Self {
        Self {
            index: HeapRb::new(INITIAL_CAPACITY),
            storage: Slab::with_capacity(INITIAL_CAPACITY),
            duration_s,
            newest: None,
            frozen: false,
            pending: Vec::new(),
            evicted_count: 0,
        }
    }

    /// Append a message, evicting anything older than `newest - duration`
    ///
    /// Returns the number of evicted messages. While frozen the message is
    /// parked and nothing is evicted.
    pub fn push(&mut self, message: StampedMessage) -> usize {
        if self.frozen {
            self.pending.push(message);
            return 0;
        }
        self.insert(message);
        self.evict()
    }

    fn insert(&mut self, message: StampedMessage) {
        let stamp = message.stamp;
        self.newest = Some(self.newest.map_or(stamp, |n| n.max(stamp)));

        if self.index.is_full() {
            self.grow();
        }
        let slab_key = self.storage.insert(message);
        let _ = self.index.try_push(MessageMeta { stamp, slab_key });
    }

    /// Double the index capacity; only metadata moves
    fn grow(&mut self) {
        let capacity = self.index.capacity().get() * 2;
        let mut index = HeapRb::new(capacity);
        for meta in self.index.pop_iter() {
            let _ = index.try_push(meta);
        }
        self.index = index;
    }

    fn evict(&mut self) -> usize {
        let Some(newest) = self.newest else {
            return 0;
        };
        let cutoff = newest - self.duration_s;
        if !self.index.iter().any(|m| m.stamp < cutoff) {
            return 0;
        }

        let mut evicted = 0;
        let remaining: Vec<MessageMeta> = self
            .index
            .pop_iter()
            .filter(|m| {
                if m.stamp >= cutoff {
                    true
                } else {
                    self.storage.remove(m.slab_key);
                    evicted += 1;
                    false
                }
            })
            .collect();

        for m in remaining {
            let _ = self.index.try_push(m);
        }

        self.evicted_count += evicted as u64;
        evicted
    }

    /// Retention applies from the next append on
    pub fn set_duration(&mut self, duration_s: f64) {
        self.duration_s = duration_s;
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration_s
    }

    /// Freeze or thaw the buffer
    ///
    /// Thawing merges parked messages (with eviction) and returns the number
    /// of messages evicted by the merge.
    pub fn set_frozen(&mut self, frozen: bool) -> usize {
        self.frozen = frozen;
        if frozen {
            return 0;
        }
        let pending = std::mem::take(&mut self.pending);
        let mut evicted = 0;
        for message in pending {
            self.insert(message);
            evicted += self.evict();
        }
        evicted
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Copy of the buffered messages ordered by stamp (ties keep arrival order)
    pub fn snapshot(&self) -> Vec<StampedMessage> {
        let mut metas: Vec<MessageMeta> = self.index.iter().copied().collect();
        metas.sort_by(|a, b| a.stamp.total_cmp(&b.stamp));
        metas
            .iter()
            .filter_map(|m| self.storage.get(m.slab_key).cloned())
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Messages parked while frozen
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.storage.clear();
        self.pending.clear();
        self.newest = None;
    }
}
