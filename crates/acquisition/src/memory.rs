//! Mock robot memory
//!
//! 键值存储，支持推送通知和故障注入。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use contracts::{now_secs, ContractError, MemoryProxy, PushCallback, PushEvent, PushSource, Value};
use tracing::{debug, trace};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process robot memory
#[derive(Debug, Default)]
pub struct MockMemory {
    /// key -> 当前值
    values: RwLock<HashMap<String, Value>>,
    /// key -> 订阅者
    watchers: Mutex<HashMap<String, Vec<Weak<MemoryWatch>>>>,
    /// 读取时应当失败的 key
    unreachable: Mutex<HashSet<String>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory pre-filled with `entries`
    pub fn with_values<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let memory = Self::new();
        for (key, value) in entries {
            memory.set(key, value);
        }
        memory
    }

    /// Store a value without notifying watchers
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Store a value and notify watchers of `key` on the calling thread
    pub fn raise_event(&self, key: &str, value: Value) {
        self.set(key, value.clone());
        let stamp = now_secs();

        let watches: Vec<Arc<MemoryWatch>> = {
            let mut watchers = lock(&self.watchers);
            match watchers.get_mut(key) {
                Some(list) => {
                    list.retain(|w| w.strong_count() > 0);
                    list.iter().filter_map(Weak::upgrade).collect()
                }
                None => Vec::new(),
            }
        };

        trace!(key = %key, watchers = watches.len(), "memory event raised");
        for watch in watches {
            watch.notify(PushEvent {
                key: key.to_string(),
                value: value.clone(),
                stamp,
            });
        }
    }

    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Make reads of `key` fail (or succeed again)
    pub fn set_unreachable(&self, key: &str, unreachable: bool) {
        let mut set = lock(&self.unreachable);
        if unreachable {
            set.insert(key.to_string());
        } else {
            set.remove(key);
        }
    }

    /// Push source watching `key`
    pub fn subscribe(&self, key: &str) -> Arc<MemoryWatch> {
        let watch = Arc::new(MemoryWatch {
            key: key.to_string(),
            callback: Mutex::new(None),
        });
        lock(&self.watchers)
            .entry(key.to_string())
            .or_default()
            .push(Arc::downgrade(&watch));
        debug!(key = %key, "memory watch created");
        watch
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl MemoryProxy for MockMemory {
    fn get_data(&self, key: &str) -> Result<Value, ContractError> {
        if lock(&self.unreachable).contains(key) {
            return Err(ContractError::key_unreachable(key, "memory proxy unreachable"));
        }
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| ContractError::key_unreachable(key, "no such key"))
    }

    fn watch(&self, key: &str) -> Result<Arc<dyn PushSource>, ContractError> {
        let watch: Arc<dyn PushSource> = self.subscribe(key);
        Ok(watch)
    }
}

/// Push source for one memory key
#[derive(Default)]
pub struct MemoryWatch {
    key: String,
    callback: Mutex<Option<PushCallback>>,
}

impl std::fmt::Debug for MemoryWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryWatch")
            .field("key", &self.key)
            .field("listening", &self.is_listening())
            .finish()
    }
}

impl MemoryWatch {
    fn notify(&self, event: PushEvent) {
        // Clone out so the callback runs without the slot lock
        let callback = lock(&self.callback).clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

impl PushSource for MemoryWatch {
    fn key(&self) -> &str {
        &self.key
    }

    fn listen(&self, callback: PushCallback) {
        let mut slot = lock(&self.callback);
        if slot.is_none() {
            *slot = Some(callback);
        }
    }

    fn stop(&self) {
        lock(&self.callback).take();
    }

    fn is_listening(&self) -> bool {
        lock(&self.callback).is_some()
    }
}
