//! # Events
//!
//! Push-driven analogue of a scheduled channel.
//!
//! An [`EventSource`] attaches a callback to a [`contracts::PushSource`] and,
//! on every notification, converts the value then publishes, records and
//! buffers it according to its own flags. The scheduler never drives it; the
//! driver only toggles its flags and drains its buffer during a dump.
//!
//! ## Usage Example
//!
//! ```ignore
//! use events::EventSource;
//!
//! let event = EventSource::new("right_bumper", push_source, convert, publisher, recorder, 10.0);
//! event.start();
//! event.set_publishing(true);
//! // ...
//! event.stop();
//! ```

mod stats;
mod source;

pub use stats::{EventMetrics, EventMetricsSnapshot};
pub use source::{EventConvert, EventSource};
