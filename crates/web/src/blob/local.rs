//! Filesystem blob backend.
//!
//! Containers are directories under a root; objects are files inside them.
//! The web binary serves the root under `/blobs`, so returned URLs are
//! `{base_url}/blobs/{container}/{object}`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use super::{BlobError, BlobStore, split_url, validate_name};

/// Path the web binary mounts the blob root under.
pub const MOUNT_PATH: &str = "/blobs";

/// Blob store writing to a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`, publishing URLs under `base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: format!("{}{MOUNT_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Directory holding all containers.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, url: &str) -> Result<PathBuf, BlobError> {
        let (container, object_name) = split_url(url, &self.public_prefix)?;
        Ok(self.root.join(container).join(object_name))
    }
}

fn not_found_aware(e: std::io::Error) -> BlobError {
    if e.kind() == std::io::ErrorKind::NotFound {
        BlobError::NotFound
    } else {
        BlobError::Io(e)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), BlobError> {
        validate_name(container)?;
        tokio::fs::create_dir_all(self.root.join(container)).await?;
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, BlobError> {
        let path = self.root.join(container).join(object_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(not_found_aware)?;
        Ok(format!("{}/{container}/{object_name}", self.public_prefix))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.object_path(url)?;
        tokio::fs::read(path).await.map_err(not_found_aware)
    }

    async fn delete(&self, url: &str) -> Result<(), BlobError> {
        let path = self.object_path(url)?;
        tokio::fs::remove_file(path).await.map_err(not_found_aware)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:3000/");

        let url = store
            .upload("product-images", "x_lamp.png", b"png-bytes".to_vec(), "image/png")
            .await
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:3000/blobs/product-images/x_lamp.png"
        );
        assert!(dir.path().join("product-images/x_lamp.png").exists());

        assert_eq!(store.download(&url).await.unwrap(), b"png-bytes");

        store.delete(&url).await.unwrap();
        assert!(matches!(store.download(&url).await, Err(BlobError::NotFound)));
        assert!(matches!(store.delete(&url).await, Err(BlobError::NotFound)));
    }

    #[tokio::test]
    async fn test_upload_creates_container_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:3000");

        store.upload("c1", "a", vec![1], "x/y").await.unwrap();
        store.upload("c1", "b", vec![2], "x/y").await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path().join("c1")).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:3000");

        let result = store.upload("c1", "../escape", vec![0], "x/y").await;
        assert!(matches!(result, Err(BlobError::InvalidObjectName(_))));

        let result = store.download("http://localhost:3000/blobs/../secret").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_foreign_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:3000");

        let result = store.download("https://cdn.example.org/blobs/c/o").await;
        assert!(matches!(result, Err(BlobError::UnknownUrl(_))));
    }
}
