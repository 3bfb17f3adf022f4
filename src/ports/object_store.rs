//! Object store port for durable key-value blobs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed future type alias used by [`ObjectStore`] to keep the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Failures of the object store. A missing key is not one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The object exists but could not be read.
    #[error("read failed for {key}: {reason}")]
    ReadFailed {
        /// Object key.
        key: String,
        /// Underlying cause.
        reason: String,
    },
    /// The object could not be written.
    #[error("write failed for {key}: {reason}")]
    WriteFailed {
        /// Object key.
        key: String,
        /// Underlying cause.
        reason: String,
    },
    /// The operation did not complete in time.
    #[error("store operation on {key} timed out after {}s", .after.as_secs())]
    Timeout {
        /// Object key.
        key: String,
        /// Elapsed deadline.
        after: Duration,
    },
}

/// Durable key-value store of byte blobs.
pub trait ObjectStore: Send + Sync {
    /// Fetches the object stored under `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the object exists but cannot be read.
    fn get(&self, key: &str) -> StoreFuture<'_, Option<Vec<u8>>>;

    /// Stores `bytes` under `key`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, key: &str, bytes: Vec<u8>) -> StoreFuture<'_, ()>;
}

/// Shared stores, so a caller can keep a handle on a store a context owns.
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn get(&self, key: &str) -> StoreFuture<'_, Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> StoreFuture<'_, ()> {
        (**self).put(key, bytes)
    }
}
