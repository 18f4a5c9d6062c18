//! # Sinks
//!
//! Sink endpoints and the shared durable-log handle.
//!
//! - [`PublishEndpoint`]: live publish on a transport topic
//! - [`RecordEndpoint`]: durable record plus rolling log buffer
//! - [`GlobalRecorder`]: at most one open durable log, shared by every
//!   record endpoint and event source
//! - [`RollingBuffer`]: ringbuf/slab message buffer with stamp retention
//! - storage: [`FileLogStorage`] (JSON lines) and [`MemoryLogStorage`]
//! - transport: [`LogTransport`] (tracing) and [`MemoryTransport`]

mod buffer;
mod metrics;
mod publish;
mod record;
mod recorder;
mod storage;
mod transport;

pub use buffer::RollingBuffer;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use publish::PublishEndpoint;
pub use record::RecordEndpoint;
pub use recorder::GlobalRecorder;
pub use storage::{read_log, FileLogStorage, MemoryLogStorage, LOG_EXTENSION};
pub use transport::{LogTransport, MemoryTransport};
