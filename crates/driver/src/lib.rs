//! # Driver
//!
//! Scheduling and dispatch core of the robot data-acquisition driver.
//!
//! - [`Registry`]: channels, sink endpoints, event sources and transport
//!   bindings, with the time-ordered work queue
//! - [`Driver::tick`] / [`Driver::run`]: the cooperative scheduling loop
//! - recording controller: [`Driver::start_recording`],
//!   [`Driver::stop_recording`], [`Driver::dump`], [`Driver::dump_named`]
//! - dynamic registration and boot wiring from a [`contracts::DriverConfig`]
//! - durable file management
//!
//! ## Locking
//!
//! Two coarse locks: the registry lock (queue + collections) and the
//! recording lock (durable-log session). Operations take them in that order.
//! A tick holds the registry lock for its decision and dispatch phase and
//! only `try_lock`s the recording lock, skipping its Record action when a
//! recording operation is in progress.
//!
//! ## Usage Example
//!
//! ```ignore
//! use driver::{Driver, DriverSettings};
//!
//! let driver = Driver::new(DriverSettings::from(&config), memory, transport, storage);
//! driver.wire(&config).await;
//!
//! let runner = driver.clone();
//! tokio::spawn(async move { runner.run().await });
//!
//! let location = driver.dump("incident").await?;
//! driver.shutdown().await;
//! ```

mod driver;
mod error;
mod files;
mod recording;
mod registry;
mod tick;
mod wiring;

pub use driver::{Driver, DriverSettings};
pub use error::DriverError;
pub use files::FileRemoval;
pub use recording::{DumpOutcome, NamedRecording};
pub use registry::{EndpointSnapshot, Registry};
pub use tick::TickReport;
pub use wiring::WiringReport;
