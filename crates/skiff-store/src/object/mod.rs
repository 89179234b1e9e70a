//! Object storage collaborator.
//!
//! The engine only ever fetches whole objects by (bucket, key); this
//! module defines that contract and a filesystem-backed implementation
//! used by the CLI and tests. Errors surface as `SnapshotUnreachable`,
//! mirroring how a cloud client's missing-bucket/missing-key/access-denied
//! failures are reported.

use crate::errors::{unreachable, Result};
use skiff_core::errors::SnapshotError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Read-side object storage contract.
pub trait ObjectStore {
    /// Fetch the full contents of one object.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Filesystem-backed object store: objects live at `root/bucket/key`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create an object store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join bucket and key under the root, rejecting path traversal.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let traverses = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if traverses {
            return Err(SnapshotError::SnapshotUnreachable {
                bucket: bucket.to_string(),
                key: key.to_string(),
                cause: "object key escapes the store root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        tracing::debug!(bucket = bucket, key = key, "Fetching object");
        fs::read(&path).map_err(|e| unreachable(bucket, key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (FsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        (store, dir)
    }

    #[test]
    fn reads_an_existing_object() {
        let (store, dir) = setup();
        let object_dir = dir.path().join("snapshots-bucket/exports/nightly");
        fs::create_dir_all(&object_dir).unwrap();
        fs::write(object_dir.join("metadata.json"), b"{}").unwrap();

        let bytes = store
            .get_object("snapshots-bucket", "exports/nightly/metadata.json")
            .unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[test]
    fn missing_object_is_unreachable() {
        let (store, _dir) = setup();
        let err = store.get_object("snapshots-bucket", "nope.json").unwrap_err();
        assert_eq!(err.code(), "ERR_SNAPSHOT_UNREACHABLE");
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let (store, _dir) = setup();
        let err = store
            .get_object("snapshots-bucket", "../../etc/passwd")
            .unwrap_err();
        assert_eq!(err.code(), "ERR_SNAPSHOT_UNREACHABLE");
    }
}
