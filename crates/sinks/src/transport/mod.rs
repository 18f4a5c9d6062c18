//! Transport implementations

mod log;
mod memory;

pub use log::LogTransport;
pub use memory::MemoryTransport;
