//! Durable log storage implementations

mod file;
mod memory;

pub use file::{read_log, FileLogStorage, LOG_EXTENSION};
pub use memory::MemoryLogStorage;
