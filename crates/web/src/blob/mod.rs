//! Blob gateway for product images.
//!
//! Uploaded objects are addressed by the absolute URL returned from
//! [`BlobStore::upload`]; that URL is what gets stored on the product and
//! what [`BlobStore::download`] and [`BlobStore::delete`] accept back.
//!
//! # Backends
//!
//! - [`AzureBlobStore`] - Azure Blob Storage REST API with a SAS token
//! - [`LocalBlobStore`] - files on disk, served by the web binary under `/blobs`
//! - [`MemoryBlobStore`] - process-local store for tests

pub mod azure;
pub mod local;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{BlobConfig, RetailConfig};

pub use azure::AzureBlobStore;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// Longest original file name kept in a generated object name.
const MAX_FILE_NAME_CHARS: usize = 100;

/// Errors that can occur during blob operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The storage service could not be reached.
    #[error("blob storage unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The storage service answered with an unexpected status.
    #[error("blob storage rejected the request with status {status}")]
    Rejected {
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// Local filesystem failure.
    #[error("blob storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No object exists at that address.
    #[error("blob not found")]
    NotFound,

    /// The container or object name is not safe to use.
    #[error("invalid blob name: {0}")]
    InvalidObjectName(String),

    /// The URL does not point into this store.
    #[error("url is not managed by this blob store: {0}")]
    UnknownUrl(String),
}

/// Binary object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the container if it does not already exist.
    async fn ensure_container(&self, container: &str) -> Result<(), BlobError>;

    /// Write an object into an existing container and return its URL.
    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError>;

    /// Fetch the bytes stored at `url`.
    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError>;

    /// Remove the object stored at `url`.
    async fn delete(&self, url: &str) -> Result<(), BlobError>;

    /// Ensure the container exists, then write the object and return its URL.
    async fn upload(
        &self,
        container: &str,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        validate_name(container)?;
        validate_name(object_name)?;
        self.ensure_container(container).await?;
        self.put_object(container, object_name, bytes, content_type)
            .await
    }
}

/// Collision-resistant object name for an uploaded file.
///
/// Produces `<uuid>_<file name>` where the file name keeps only ASCII
/// letters, digits, `.`, `-` and `_`. Any directory part of the original
/// name is dropped.
#[must_use]
pub fn object_name_for(original_file_name: &str) -> String {
    let base = original_file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let sanitized: String = base
        .chars()
        .take(MAX_FILE_NAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    let name = if sanitized.is_empty() {
        "image"
    } else {
        sanitized
    };
    format!("{}_{name}", uuid::Uuid::new_v4())
}

/// Build the blob backend named by the configuration.
#[must_use]
pub fn from_config(config: &RetailConfig) -> Arc<dyn BlobStore> {
    match &config.blob {
        BlobConfig::Local { root } => Arc::new(LocalBlobStore::new(root, &config.base_url)),
        BlobConfig::Azure {
            account_url,
            sas_token,
        } => Arc::new(AzureBlobStore::new(account_url.clone(), sas_token.clone())),
    }
}

/// Reject names that could escape their container.
pub(crate) fn validate_name(name: &str) -> Result<(), BlobError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if unsafe_name {
        return Err(BlobError::InvalidObjectName(name.to_string()));
    }
    Ok(())
}

/// Split `<prefix>/<container>/<object>` into its container and object parts.
pub(crate) fn split_url<'u>(url: &'u str, prefix: &str) -> Result<(&'u str, &'u str), BlobError> {
    let rest = url
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| BlobError::UnknownUrl(url.to_string()))?;
    let (container, object_name) = rest
        .split_once('/')
        .ok_or_else(|| BlobError::UnknownUrl(url.to_string()))?;

    validate_name(container)?;
    validate_name(object_name)?;
    Ok((container, object_name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_keeps_file_name() {
        let name = object_name_for("lamp.png");
        let (prefix, rest) = name.split_once('_').unwrap();
        assert!(uuid::Uuid::parse_str(prefix).is_ok());
        assert_eq!(rest, "lamp.png");
    }

    #[test]
    fn test_object_name_is_unique() {
        assert_ne!(object_name_for("a.png"), object_name_for("a.png"));
    }

    #[test]
    fn test_object_name_strips_directories() {
        assert!(object_name_for("../../etc/passwd").ends_with("_passwd"));
        assert!(object_name_for(r"C:\photos\cat.jpg").ends_with("_cat.jpg"));
    }

    #[test]
    fn test_object_name_replaces_unsafe_characters() {
        assert!(object_name_for("my photo (1).jpg").ends_with("_my_photo__1_.jpg"));
    }

    #[test]
    fn test_object_name_falls_back_for_empty() {
        assert!(object_name_for("").ends_with("_image"));
        assert!(object_name_for("...").ends_with("_image"));
        assert!(object_name_for("uploads/").ends_with("_image"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("product-images").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[test]
    fn test_split_url() {
        let (container, object) =
            split_url("http://host/blobs/product-images/x_a.png", "http://host/blobs").unwrap();
        assert_eq!(container, "product-images");
        assert_eq!(object, "x_a.png");

        assert!(matches!(
            split_url("http://other/blobs/c/o", "http://host/blobs"),
            Err(BlobError::UnknownUrl(_))
        ));
        assert!(matches!(
            split_url("http://host/blobs/c/../o", "http://host/blobs"),
            Err(BlobError::InvalidObjectName(_))
        ));
    }
}
