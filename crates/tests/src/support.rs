//! Shared fixtures: a driver over in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use acquisition::MockMemory;
use contracts::{ContractError, LogStorage, LogWriter, Value};
use driver::{Driver, DriverSettings};
use sinks::{MemoryLogStorage, MemoryTransport};

pub struct Rig {
    pub driver: Driver,
    pub memory: Arc<MockMemory>,
    pub transport: Arc<MemoryTransport>,
    pub storage: Arc<MemoryLogStorage>,
}

pub fn rig() -> Rig {
    rig_with(DriverSettings::default())
}

pub fn rig_with(settings: DriverSettings) -> Rig {
    let memory = Arc::new(MockMemory::with_values([
        ("Sonar", Value::Float(0.5)),
        ("Battery", Value::Float(0.9)),
        ("Bumper", Value::Float(0.0)),
        ("Body/Type", Value::Str("humanoid".into())),
    ]));
    let transport = Arc::new(MemoryTransport::new("memory"));
    let storage = Arc::new(MemoryLogStorage::new());
    let driver = Driver::new(settings, memory.clone(), transport.clone(), storage.clone());
    Rig {
        driver,
        memory,
        transport,
        storage,
    }
}

/// Topics present in a written log, sorted and deduplicated
pub fn topics(storage: &MemoryLogStorage, location: &str) -> Vec<String> {
    let mut topics: Vec<String> = storage
        .messages(location)
        .into_iter()
        .map(|m| m.topic)
        .collect();
    topics.sort();
    topics.dedup();
    topics
}

/// Storage whose `open` for one prefix blocks until released
///
/// Lets a test hold a dump in the middle of its critical section.
pub struct GatedStorage {
    inner: Arc<MemoryLogStorage>,
    prefix: String,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

pub struct Gate {
    pub entered: mpsc::Receiver<()>,
    pub release: mpsc::Sender<()>,
}

impl GatedStorage {
    pub fn new(inner: Arc<MemoryLogStorage>, prefix: &str) -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let storage = Self {
            inner,
            prefix: prefix.to_string(),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (storage, gate)
    }
}

impl LogStorage for GatedStorage {
    fn open(&self, prefix: &str) -> Result<Box<dyn LogWriter>, ContractError> {
        if prefix == self.prefix {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
                if let Some(release) = self.release.lock().unwrap().take() {
                    release.recv().unwrap();
                }
            }
        }
        self.inner.open(prefix)
    }

    fn usage_bytes(&self) -> Result<u64, ContractError> {
        self.inner.usage_bytes()
    }

    fn list(&self) -> Result<Vec<String>, ContractError> {
        self.inner.list()
    }

    fn remove(&self, location: &str) -> Result<(), ContractError> {
        self.inner.remove(location)
    }

    fn is_managed(&self, location: &str) -> bool {
        self.inner.is_managed(location)
    }

    fn root(&self) -> String {
        self.inner.root()
    }
}

/// Storage whose n-th `open` (1-based) fails
pub struct FlakyStorage {
    inner: Arc<MemoryLogStorage>,
    fail_at: usize,
    opens: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(inner: Arc<MemoryLogStorage>, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            opens: AtomicUsize::new(0),
        }
    }
}

impl LogStorage for FlakyStorage {
    fn open(&self, prefix: &str) -> Result<Box<dyn LogWriter>, ContractError> {
        if self.opens.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(ContractError::storage("device not ready"));
        }
        self.inner.open(prefix)
    }

    fn usage_bytes(&self) -> Result<u64, ContractError> {
        self.inner.usage_bytes()
    }

    fn list(&self) -> Result<Vec<String>, ContractError> {
        self.inner.list()
    }

    fn remove(&self, location: &str) -> Result<(), ContractError> {
        self.inner.remove(location)
    }

    fn is_managed(&self, location: &str) -> bool {
        self.inner.is_managed(location)
    }

    fn root(&self) -> String {
        self.inner.root()
    }
}
