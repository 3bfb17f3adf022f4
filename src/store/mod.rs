//! Project store: typed persistence of snapshots, file contents and audit
//! records over the `ObjectStore` port.
//!
//! Key layout under the configured prefix:
//!
//! ```text
//! <prefix><projectId>/
//!   ├── snapshot.json
//!   ├── files/<path>
//!   └── requirements/<id>.txt
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::PipelineError;
use crate::ports::object_store::{ObjectStore, StoreError};
use crate::snapshot::ProjectSnapshot;

/// Checks that `project_id` names exactly one namespace under the prefix.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidProjectId`] for empty ids and ids that
/// contain a separator or a `..` sequence.
pub fn check_project_id(project_id: &str) -> Result<(), PipelineError> {
    let reason = if project_id.trim().is_empty() {
        "must not be empty"
    } else if project_id.contains(['/', '\\']) {
        "must not contain path separators"
    } else if project_id.contains("..") || project_id == "." {
        "must not be a relative path segment"
    } else {
        return Ok(());
    };
    Err(PipelineError::InvalidProjectId { project_id: project_id.to_string(), reason })
}

/// Persistence layer for one object store namespace.
///
/// Every call is bounded by the configured store deadline.
pub struct ProjectStore<'a> {
    objects: &'a dyn ObjectStore,
    prefix: String,
    timeout: Duration,
}

impl<'a> ProjectStore<'a> {
    /// Creates a store over `objects` with keys under `prefix`.
    #[must_use]
    pub fn new(objects: &'a dyn ObjectStore, prefix: &str, timeout: Duration) -> Self {
        let prefix = match prefix.trim_matches('/') {
            "" => String::new(),
            p => format!("{p}/"),
        };
        Self { objects, prefix, timeout }
    }

    /// Namespace of one project.
    #[must_use]
    pub fn project_prefix(&self, project_id: &str) -> String {
        format!("{}{project_id}/", self.prefix)
    }

    /// Key of a project's snapshot.
    #[must_use]
    pub fn snapshot_key(&self, project_id: &str) -> String {
        format!("{}snapshot.json", self.project_prefix(project_id))
    }

    /// Key of one file's content.
    #[must_use]
    pub fn file_key(&self, project_id: &str, path: &str) -> String {
        format!("{}files/{}", self.project_prefix(project_id), path.trim_start_matches('/'))
    }

    /// Key of one audit record.
    #[must_use]
    pub fn requirement_key(&self, project_id: &str, record_id: &str) -> String {
        format!("{}requirements/{record_id}.txt", self.project_prefix(project_id))
    }

    /// Loads a project's snapshot; `None` means the project does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the snapshot does not deserialize.
    pub async fn load_snapshot(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectSnapshot>, PipelineError> {
        let key = self.snapshot_key(project_id);
        let Some(bytes) = self.bounded(&key, self.objects.get(&key)).await? else {
            debug!(project_id, "No snapshot stored");
            return Ok(None);
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| PipelineError::CorruptSnapshot {
            project_id: project_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Writes a project's snapshot after reconciling it. This is the commit
    /// point of every flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn save_snapshot(&self, snapshot: &ProjectSnapshot) -> Result<(), PipelineError> {
        let mut snapshot = snapshot.clone();
        snapshot.reconcile();
        let key = self.snapshot_key(&snapshot.project_id);
        let body = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::WriteFailed {
            key: key.clone(),
            reason: format!("failed to serialize snapshot: {e}"),
        })?;
        self.bounded(&key, self.objects.put(&key, body)).await?;
        Ok(())
    }

    /// Loads one file's content, or `None` when it was never stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn load_file(
        &self,
        project_id: &str,
        path: &str,
    ) -> Result<Option<String>, PipelineError> {
        let key = self.file_key(project_id, path);
        let bytes = self.bounded(&key, self.objects.get(&key)).await?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// Stores full contents for each `(path, content)`.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failed write.
    pub async fn save_files(
        &self,
        project_id: &str,
        files: &[(String, String)],
    ) -> Result<(), PipelineError> {
        for (path, content) in files {
            let key = self.file_key(project_id, path);
            self.bounded(&key, self.objects.put(&key, content.clone().into_bytes())).await?;
        }
        debug!(project_id, count = files.len(), "Stored file contents");
        Ok(())
    }

    /// Writes a write-once audit copy of a request and returns its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn save_requirement(
        &self,
        project_id: &str,
        record_id: &str,
        text: &str,
    ) -> Result<String, PipelineError> {
        let key = self.requirement_key(project_id, record_id);
        self.bounded(&key, self.objects.put(&key, text.as_bytes().to_vec())).await?;
        Ok(key)
    }

    async fn bounded<T>(
        &self,
        key: &str,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout { key: key.to_string(), after: self.timeout })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryObjectStore;
    use crate::ports::object_store::StoreFuture;

    fn store(objects: &MemoryObjectStore) -> ProjectStore<'_> {
        ProjectStore::new(objects, "projects/", Duration::from_secs(5))
    }

    #[test]
    fn key_layout() {
        let objects = MemoryObjectStore::new();
        let store = store(&objects);
        assert_eq!(store.snapshot_key("p1"), "projects/p1/snapshot.json");
        assert_eq!(store.file_key("p1", "/src/main.ts"), "projects/p1/files/src/main.ts");
        assert_eq!(store.requirement_key("p1", "abc"), "projects/p1/requirements/abc.txt");
    }

    #[test]
    fn project_ids_cannot_reach_other_namespaces() {
        assert!(check_project_id("p1").is_ok());
        assert!(check_project_id("my-project_2.v1").is_ok());
        for bad in ["", "  ", "p1/files/x", "..", "a..b", ".", "p1\\x"] {
            let err = check_project_id(bad).unwrap_err();
            assert!(err.is_validation(), "{bad:?}");
        }
    }

    #[test]
    fn prefix_is_normalized() {
        let objects = MemoryObjectStore::new();
        let bare = ProjectStore::new(&objects, "tenants/a", Duration::from_secs(1));
        assert_eq!(bare.snapshot_key("p"), "tenants/a/p/snapshot.json");
        let empty = ProjectStore::new(&objects, "", Duration::from_secs(1));
        assert_eq!(empty.snapshot_key("p"), "p/snapshot.json");
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let objects = MemoryObjectStore::new();
        assert!(store(&objects).load_snapshot("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_round_trips_reconciled() {
        let objects = MemoryObjectStore::new();
        let store = store(&objects);
        let mut snapshot = ProjectSnapshot::new("p1", "typescript", "nestjs");
        snapshot.files.push("src/main.ts".into());

        store.save_snapshot(&snapshot).await.unwrap();
        let loaded = store.load_snapshot("p1").await.unwrap().unwrap();

        assert_eq!(loaded.files, vec!["src/main.ts"]);
        assert!(loaded.roles.contains_key("src/main.ts"));
        assert!(loaded.summaries.contains_key("src/main.ts"));
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let objects = MemoryObjectStore::new();
        objects.put("projects/p1/snapshot.json", b"{not json".to_vec()).await.unwrap();
        let err = store(&objects).load_snapshot("p1").await.unwrap_err();
        assert!(matches!(err, PipelineError::CorruptSnapshot { .. }));
    }

    #[tokio::test]
    async fn files_and_requirements_are_stored_under_the_project() {
        let objects = MemoryObjectStore::new();
        let store = store(&objects);

        store.save_files("p1", &[("a.ts".into(), "a\n".into())]).await.unwrap();
        let key = store.save_requirement("p1", "r1", "build it").await.unwrap();

        assert_eq!(store.load_file("p1", "a.ts").await.unwrap().as_deref(), Some("a\n"));
        assert_eq!(store.load_file("p1", "b.ts").await.unwrap(), None);
        assert_eq!(objects.get_text(&key).as_deref(), Some("build it"));
    }

    /// Never answers.
    struct Stalled;

    impl ObjectStore for Stalled {
        fn get(&self, _key: &str) -> StoreFuture<'_, Option<Vec<u8>>> {
            Box::pin(std::future::pending::<Result<Option<Vec<u8>>, StoreError>>())
        }

        fn put(&self, _key: &str, _body: Vec<u8>) -> StoreFuture<'_, ()> {
            Box::pin(std::future::pending::<Result<(), StoreError>>())
        }
    }

    #[tokio::test]
    async fn stalled_store_times_out() {
        let deadline = Duration::from_millis(50);
        let store = ProjectStore::new(&Stalled, "projects/", deadline);

        let err = store.load_snapshot("p1").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Store(StoreError::Timeout { ref key, after })
                if key == "projects/p1/snapshot.json" && after == deadline
        ));
        assert!(store.save_files("p1", &[("a.ts".into(), "a".into())]).await.is_err());
    }
}
