//! In-process blob store for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobError, BlobStore, split_url};

const PREFIX: &str = "memory://blobs";

/// A stored object and its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Object bytes.
    pub bytes: Vec<u8>,
    /// Content type given at upload.
    pub content_type: String,
}

/// Blob store held in memory. URLs use the `memory://blobs/` scheme.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: RwLock<HashSet<String>>,
    objects: RwLock<HashMap<(String, String), StoredBlob>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a container has been created.
    pub async fn has_container(&self, container: &str) -> bool {
        self.containers.read().await.contains(container)
    }

    /// Number of stored objects across all containers.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Look up an object by URL without going through [`BlobStore::download`].
    pub async fn get(&self, url: &str) -> Option<StoredBlob> {
        let (container, object_name) = split_url(url, PREFIX).ok()?;
        self.objects
            .read()
            .await
            .get(&(container.to_owned(), object_name.to_owned()))
            .cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), BlobError> {
        self.containers.write().await.insert(container.to_owned());
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        if !self.has_container(container).await {
            return Err(BlobError::NotFound);
        }
        self.objects.write().await.insert(
            (container.to_owned(), object_name.to_owned()),
            StoredBlob {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(format!("{PREFIX}/{container}/{object_name}"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        split_url(url, PREFIX)?;
        self.get(url)
            .await
            .map(|blob| blob.bytes)
            .ok_or(BlobError::NotFound)
    }

    async fn delete(&self, url: &str) -> Result<(), BlobError> {
        let (container, object_name) = split_url(url, PREFIX)?;
        self.objects
            .write()
            .await
            .remove(&(container.to_owned(), object_name.to_owned()))
            .map(|_| ())
            .ok_or(BlobError::NotFound)
    }
}
