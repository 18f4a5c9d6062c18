//! # Contracts
//!
//! Frozen interface contracts shared by every driver crate: channel identity,
//! acquired values, transport messages, action kinds, boot configuration and
//! the collaborator traits the core consumes but does not own.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Message stamps are wall-clock seconds since the UNIX epoch (`f64`)
//! - Scheduling deadlines live in the scheduler and never leave it

mod action;
mod channel_id;
mod config;
mod error;
mod memory;
mod message;
mod push_source;
mod storage;
mod transport;
mod value;

pub use action::{ActionKind, ActionSet};
pub use channel_id::ChannelId;
pub use config::*;
pub use error::*;
pub use memory::MemoryProxy;
pub use message::{now_secs, ImageData, ImageFormat, JointStateData, Payload, StampedMessage};
pub use push_source::{PushCallback, PushEvent, PushSource};
pub use storage::{LogStorage, LogWriter};
pub use transport::{Transport, TransportBinding};
pub use value::{DataType, Value};
