use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{validate_key, AttachmentStore, StoreError};

/// Attachment store on the local filesystem
///
/// Layout: `<base_dir>/<owner_id>/<stored_filename>`.
pub struct LocalDiskStore {
    base_dir: PathBuf,
}

impl LocalDiskStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl AttachmentStore for LocalDiskStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Internal(format!("mkdir: {e}")))?;
        }

        debug!(path = %path.display(), bytes = data.len(), "Writing attachment");
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| StoreError::Internal(format!("write {}: {e}", path.display())))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(StoreError::Internal(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Internal(format!(
                "delete {}: {e}",
                path.display()
            ))),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        let dir = self.resolve(prefix)?;
        debug!(path = %dir.display(), "Removing attachment directory");
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Internal(format!(
                "delete {}: {e}",
                dir.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(tmp.path());

        store
            .put("owner/notes_1.txt", Bytes::from("hello world"))
            .await
            .unwrap();
        let data = store.get("owner/notes_1.txt").await.unwrap();
        assert_eq!(data.as_ref(), b"hello world");
        assert!(tmp.path().join("owner").join("notes_1.txt").exists());
    }

    #[tokio::test]
    async fn get_missing_returns_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(tmp.path());

        let err = store.get("owner/missing.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_file_and_tolerates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(tmp.path());

        store.put("owner/a.txt", Bytes::from("data")).await.unwrap();
        store.delete("owner/a.txt").await.unwrap();
        assert!(matches!(
            store.get("owner/a.txt").await.unwrap_err(),
            StoreError::NotFound(_)
        ));

        store.delete("owner/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn delete_prefix_removes_only_that_owner() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(tmp.path());

        store.put("alice/a.txt", Bytes::from("a")).await.unwrap();
        store.put("alice/b.txt", Bytes::from("b")).await.unwrap();
        store.put("bob/c.txt", Bytes::from("c")).await.unwrap();

        store.delete_prefix("alice").await.unwrap();

        assert!(!tmp.path().join("alice").exists());
        assert_eq!(store.get("bob/c.txt").await.unwrap().as_ref(), b"c");

        // Already gone
        store.delete_prefix("alice").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(tmp.path());

        let err = store
            .put("../escape.txt", Bytes::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(matches!(
            store.delete_prefix("..").await.unwrap_err(),
            StoreError::InvalidKey(_)
        ));
    }
}
