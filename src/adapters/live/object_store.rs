//! Filesystem-backed object store.
//!
//! Each key maps to a file under the root directory, so a project stored
//! under `projects/<id>/` can be inspected with ordinary tools:
//!
//! ```text
//! <root>/projects/<id>/
//!   ├── snapshot.json
//!   ├── files/...
//!   └── requirements/<record id>.txt
//! ```

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::ports::object_store::{ObjectStore, StoreError, StoreFuture};

/// Object store that keeps each object as a file under `root`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Creates a store rooted at the given directory (created lazily on first write).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a key to a path, refusing keys that would escape the root.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || key.is_empty() {
            None
        } else {
            Some(self.root.join(relative))
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Option<Vec<u8>>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key).ok_or_else(|| StoreError::ReadFailed {
                key: key.clone(),
                reason: "key escapes the store root".into(),
            })?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StoreError::ReadFailed { key, reason: e.to_string() }),
            }
        })
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> StoreFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key).ok_or_else(|| StoreError::WriteFailed {
                key: key.clone(),
                reason: "key escapes the store root".into(),
            })?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::WriteFailed { key: key.clone(), reason: e.to_string() })?;
            }
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| StoreError::WriteFailed { key, reason: e.to_string() })
        })
    }
}
