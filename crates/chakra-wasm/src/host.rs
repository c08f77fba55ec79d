//! Browser backends: `window.localStorage` for persistence and
//! `Date.now()` for the debounce clock.

use chakra_state::{Clock, KeyValueStore, StorageError};
use wasm_bindgen::JsValue;
use web_sys::Storage;

pub struct LocalStorage {
    inner: Storage,
}

impl LocalStorage {
    /// The page's `localStorage`, if the browser lets us use it (it is
    /// missing in some private modes and sandboxed frames).
    pub fn open() -> Result<Self, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        let inner = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(describe(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".into()))?;
        Ok(Self { inner })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner
            .get_item(key)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_item(key, value).map_err(|e| {
            let message = describe(&e);
            if message.contains("QuotaExceeded") {
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: value.len(),
                }
            } else {
                StorageError::Backend(message)
            }
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner
            .remove_item(key)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Millisecond wall clock of the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}
