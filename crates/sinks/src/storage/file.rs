//! FileLogStorage - JSON-lines durable logs in one directory

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, LogStorage, LogWriter, StampedMessage};
use tracing::{debug, error, warn};

/// Extension of every log managed by [`FileLogStorage`]
pub const LOG_EXTENSION: &str = "jsonl";

/// Durable logs stored as `<prefix>_<local time>.jsonl` files
#[derive(Debug, Clone)]
pub struct FileLogStorage {
    dir: PathBuf,
}

impl FileLogStorage {
    /// Use `dir` as the log directory (created lazily on first open)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn managed_files(&self) -> Result<Vec<PathBuf>, ContractError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && has_log_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// First free file name for `prefix` at the current local time
    fn next_path(&self, prefix: &str) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
        let base = format!("{prefix}_{stamp}");
        let mut path = self.dir.join(format!("{base}.{LOG_EXTENSION}"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{base}_{n}.{LOG_EXTENSION}"));
            n += 1;
        }
        path
    }
}

fn has_log_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION)
}

impl LogStorage for FileLogStorage {
    fn open(&self, prefix: &str) -> Result<Box<dyn LogWriter>, ContractError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.next_path(prefix);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "could not open durable log");
                ContractError::storage(format!("cannot open {}: {e}", path.display()))
            })?;
        debug!(path = %path.display(), "durable log file created");
        Ok(Box::new(FileLogWriter {
            location: path.display().to_string(),
            out: BufWriter::new(file),
            count: 0,
        }))
    }

    fn usage_bytes(&self) -> Result<u64, ContractError> {
        let mut total = 0;
        for path in self.managed_files()? {
            total += fs::metadata(&path)?.len();
        }
        Ok(total)
    }

    fn list(&self) -> Result<Vec<String>, ContractError> {
        Ok(self
            .managed_files()?
            .iter()
            .map(|p| p.display().to_string())
            .collect())
    }

    fn remove(&self, location: &str) -> Result<(), ContractError> {
        if !self.is_managed(location) {
            warn!(location = %location, dir = %self.dir.display(), "refusing to remove unmanaged file");
            return Err(ContractError::storage(format!(
                "{location} is not a durable log in {}",
                self.dir.display()
            )));
        }
        fs::remove_file(location)?;
        debug!(location = %location, "durable log removed");
        Ok(())
    }

    fn is_managed(&self, location: &str) -> bool {
        let path = Path::new(location);
        if !has_log_extension(path) {
            return false;
        }
        let (Ok(file), Ok(dir)) = (path.canonicalize(), self.dir.canonicalize()) else {
            return false;
        };
        file.is_file() && file.parent() == Some(dir.as_path())
    }

    fn root(&self) -> String {
        self.dir.display().to_string()
    }
}

struct FileLogWriter {
    location: String,
    out: BufWriter<File>,
    count: usize,
}

impl LogWriter for FileLogWriter {
    fn location(&self) -> &str {
        &self.location
    }

    fn append(&mut self, message: &StampedMessage) -> Result<(), ContractError> {
        serde_json::to_writer(&mut self.out, message)
            .map_err(|e| ContractError::storage(format!("encode error: {e}")))?;
        self.out.write_all(b"\n")?;
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }

    fn close(mut self: Box<Self>) -> Result<String, ContractError> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(self.location)
    }
}

/// Read every message of a JSON-lines log back
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<StampedMessage>, ContractError> {
    let reader = BufReader::new(File::open(path)?);
    let mut messages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message = serde_json::from_str(&line)
            .map_err(|e| ContractError::storage(format!("decode error: {e}")))?;
        messages.push(message);
    }
    Ok(messages)
}
