//! Command implementations.

mod files;
mod info;
mod run;
mod validate;

pub use files::run_files;
pub use info::run_info;
pub use run::run_driver;
pub use validate::run_validate;
