//! # Scheduler
//!
//! Scheduling primitives for the driver's cooperative loop.
//!
//! - [`Channel`]: a named converter plus a fixed action → callback table
//! - [`WorkQueue`]: time-ordered queue of [`ScheduledEntry`], at most one
//!   entry per channel index
//!
//! The loop itself (peek, resolve actions, dispatch, sleep, re-arm) lives in
//! the `driver` crate, which owns the registry lock around these types.
//!
//! ## Example
//!
//! ```ignore
//! use scheduler::{WorkQueue, rearm};
//! use tokio::time::Instant;
//!
//! let mut queue = WorkQueue::new();
//! queue.push(Instant::now(), 0);
//! let entry = queue.pop().unwrap();
//! if let Some(next) = rearm(entry.due, 10.0) {
//!     queue.push(next, entry.index);
//! }
//! ```

mod channel;
mod queue;

pub use channel::{Callback, CallbackTable, Channel, Converter};
pub use queue::{period, rearm, ScheduledEntry, WorkQueue};
