//! # Acquisition
//!
//! Concrete acquisition layer used by the binary and the tests.
//!
//! - [`MockMemory`]: key/value robot memory with push notifications and
//!   injectable failures
//! - converters reading memory keys into transport messages
//!   ([`MemoryConverter`], [`MemoryListConverter`], [`InfoConverter`])
//! - [`RobotSimulator`]: background thread animating a [`MockMemory`]

mod converters;
mod memory;
mod simulator;

pub use converters::{
    probe_type, scalar_payload, InfoConverter, MemoryConverter, MemoryListConverter,
};
pub use memory::{MemoryWatch, MockMemory};
pub use simulator::{keys, RobotSimulator, SimulatorConfig};
