//! Key-value persistence backends.
//!
//! The store only needs string get/set/remove, the same surface as the
//! browser's `localStorage`. `MemoryStorage` is a shared in-process
//! backend for native hosts and tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded writing {key} ({bytes} bytes)")]
    QuotaExceeded { key: String, bytes: usize },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String key-value store used for snapshots and small settings.
pub trait KeyValueStore {
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns an error if the value cannot be written (e.g. quota).
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    /// Returns an error if the backend rejects the removal.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: usize,
    quota: Option<usize>,
}

/// In-memory backend. Clones share the same underlying map, so a host can
/// keep a handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects values larger than `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let storage = Self::default();
        storage.inner.borrow_mut().quota = Some(bytes);
        storage
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Current value under `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.borrow().values.get(key).cloned()
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.inner.borrow_mut().quota = bytes;
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.borrow().values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        if let Some(quota) = inner.quota
            && value.len() > quota
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                bytes: value.len(),
            });
        }
        inner.values.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.borrow_mut().values.remove(key);
        Ok(())
    }
}
