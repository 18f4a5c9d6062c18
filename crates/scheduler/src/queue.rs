//! Time-ordered work queue.
//!
//! Min-heap on `(due, seq)`: earliest due first, ties broken by insertion
//! order. A side set of live indices enforces one entry per channel.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

/// One pending unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEntry {
    /// When the channel is due
    pub due: Instant,
    /// Index of the channel in the registry arena
    pub index: usize,
    /// Insertion sequence (tie breaker)
    seq: u64,
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scheduling queue over channel indices
#[derive(Debug, Default)]
pub struct WorkQueue {
    heap: BinaryHeap<Reverse<ScheduledEntry>>,
    live: HashSet<usize>,
    next_seq: u64,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `index` at `due`
    ///
    /// Returns `false` (and schedules nothing) if `index` already has an entry.
    pub fn push(&mut self, due: Instant, index: usize) -> bool {
        if !self.live.insert(index) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEntry { due, index, seq }));
        true
    }

    /// Earliest entry, if any
    #[inline]
    pub fn peek(&self) -> Option<ScheduledEntry> {
        self.heap.peek().map(|Reverse(entry)| *entry)
    }

    /// Remove the earliest entry
    pub fn pop(&mut self) -> Option<ScheduledEntry> {
        let Reverse(entry) = self.heap.pop()?;
        self.live.remove(&entry.index);
        Some(entry)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether `index` currently waits in the queue
    pub fn contains(&self, index: usize) -> bool {
        self.live.contains(&index)
    }

    /// Scheduled indices, sorted
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.heap.iter().map(|Reverse(e)| e.index).collect();
        indices.sort_unstable();
        indices
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}

/// Period of a channel running at `frequency` Hz
///
/// `None` for one-shot channels and for frequencies so low that the period
/// does not fit in a [`Duration`].
pub fn period(frequency: f64) -> Option<Duration> {
    if frequency > 0.0 && frequency.is_finite() {
        Duration::try_from_secs_f64(frequency.recip()).ok()
    } else {
        None
    }
}

/// Next due time after `previous`, or `None` when the channel goes dormant
///
/// Uses the previous due time rather than "now" so a late tick does not
/// accumulate drift. A positive frequency whose next due time cannot be
/// represented also goes dormant.
pub fn rearm(previous: Instant, frequency: f64) -> Option<Instant> {
    let next = period(frequency).and_then(|p| previous.checked_add(p));
    if next.is_none() && frequency > 0.0 {
        warn!(frequency, "period out of range; channel goes dormant");
    }
    next
}
