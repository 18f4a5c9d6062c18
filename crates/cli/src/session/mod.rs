//! Driver session - boots, runs and winds down one driver instance.

mod runner;
mod stats;

pub use runner::{Session, SessionConfig};
pub use stats::SessionStats;
