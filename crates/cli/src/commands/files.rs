//! `files` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use acquisition::MockMemory;
use anyhow::Result;
use driver::{Driver, DriverSettings, FileRemoval};
use sinks::{FileLogStorage, LogTransport};
use tracing::info;

use crate::cli::{FilesAction, FilesArgs};
use crate::error::CliError;

/// Execute the `files` command
pub fn run_files(args: &FilesArgs) -> Result<()> {
    let dir = record_directory(args);
    info!(dir = %dir.display(), "Managing durable logs");

    // A driver with no channels, used only for its file management
    let driver = Driver::new(
        DriverSettings::default(),
        Arc::new(MockMemory::new()),
        Arc::new(LogTransport::new("files")),
        Arc::new(FileLogStorage::new(dir)),
    );

    match &args.action {
        FilesAction::List => {
            for file in driver.list_files()? {
                println!("{}", file);
            }
            Ok(())
        }
        FilesAction::Clean => report(driver.remove_all_files()?),
        FilesAction::Rm { paths } => report(driver.remove_files(paths)),
    }
}

fn record_directory(args: &FilesArgs) -> PathBuf {
    if let Some(dir) = &args.dir {
        return dir.clone();
    }
    let config = config_loader::ConfigLoader::load_boot_config(args.config.as_deref());
    PathBuf::from(config.recording.directory)
}

fn report(removal: FileRemoval) -> Result<()> {
    for path in &removal.removed {
        println!("✓ removed {}", path);
    }
    for (path, reason) in &removal.refused {
        println!("✗ kept {} ({})", path, reason);
    }
    if removal.refused.is_empty() {
        Ok(())
    } else {
        Err(CliError::FilesRefused {
            refused: removal.refused.len(),
        }
        .into())
    }
}
