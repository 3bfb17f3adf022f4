//! In-memory object store for tests and replayed runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::ports::object_store::{ObjectStore, StoreError, StoreFuture};

/// Object store held entirely in memory.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every key currently stored, in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().expect("store lock poisoned").keys().cloned().collect()
    }

    /// Returns an object decoded as UTF-8, if present.
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Deletes an object, returning whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.objects.lock().expect("store lock poisoned").remove(key).is_some()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Option<Vec<u8>>> {
        let result = self
            .objects
            .lock()
            .map(|objects| objects.get(key).cloned())
            .map_err(|e| StoreError::ReadFailed { key: key.to_string(), reason: e.to_string() });
        Box::pin(async move { result })
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> StoreFuture<'_, ()> {
        let result = self
            .objects
            .lock()
            .map(|mut objects| {
                objects.insert(key.to_string(), bytes);
            })
            .map_err(|e| StoreError::WriteFailed { key: key.to_string(), reason: e.to_string() });
        Box::pin(async move { result })
    }
}
