//! Azure Blob Storage backend.
//!
//! Talks to the Blob service REST API directly. Requests are authorized by
//! appending an account SAS token to the query string; the URLs handed back
//! to callers never include it.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use url::Url;

use super::{BlobError, BlobStore, split_url, validate_name};

const API_VERSION: &str = "2023-11-03";

/// Blob store backed by an Azure storage account.
#[derive(Clone)]
pub struct AzureBlobStore {
    client: reqwest::Client,
    account_url: Url,
    sas_token: SecretString,
}

impl AzureBlobStore {
    /// Create a client for the account at `account_url`.
    #[must_use]
    pub fn new(account_url: Url, sas_token: SecretString) -> Self {
        let mut account_url = account_url;
        if !account_url.path().ends_with('/') {
            let path = format!("{}/", account_url.path());
            account_url.set_path(&path);
        }
        account_url.set_query(None);

        Self {
            client: reqwest::Client::new(),
            account_url,
            sas_token,
        }
    }

    /// Account URL without a trailing slash, used as the public URL prefix.
    fn public_prefix(&self) -> &str {
        self.account_url.as_str().trim_end_matches('/')
    }

    fn object_url(&self, container: &str, object_name: &str) -> Result<Url, BlobError> {
        self.account_url
            .join(&format!("{container}/{object_name}"))
            .map_err(|e| BlobError::InvalidObjectName(format!("{object_name}: {e}")))
    }

    /// Attach the SAS token (plus any extra parameters) to a request URL.
    fn signed(&self, mut url: Url, extra: Option<&str>) -> Url {
        let sas = self.sas_token.expose_secret().trim_start_matches('?');
        let query = match extra {
            Some(extra) => format!("{extra}&{sas}"),
            None => sas.to_string(),
        };
        url.set_query(Some(&query));
        url
    }
}

fn unexpected(status: StatusCode) -> BlobError {
    if status == StatusCode::NOT_FOUND {
        BlobError::NotFound
    } else {
        BlobError::Rejected {
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    #[instrument(skip(self))]
    async fn ensure_container(&self, container: &str) -> Result<(), BlobError> {
        validate_name(container)?;
        let url = self
            .account_url
            .join(container)
            .map_err(|e| BlobError::InvalidObjectName(format!("{container}: {e}")))?;

        let response = self
            .client
            .put(self.signed(url, Some("restype=container")))
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-public-access", "blob")
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(container, "created blob container");
                Ok(())
            }
            StatusCode::CONFLICT => Ok(()),
            status => Err(unexpected(status)),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put_object(
        &self,
        container: &str,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        let url = self.object_url(container, object_name)?;

        let response = self
            .client
            .put(self.signed(url.clone(), None))
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(unexpected(response.status()));
        }
        Ok(url.to_string())
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        let (container, object_name) = split_url(url, self.public_prefix())?;
        let url = self.object_url(container, object_name)?;

        let response = self
            .client
            .get(self.signed(url, None))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(unexpected(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), BlobError> {
        let (container, object_name) = split_url(url, self.public_prefix())?;
        let url = self.object_url(container, object_name)?;

        let response = self
            .client
            .delete(self.signed(url, None))
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            return Err(unexpected(response.status()));
        }
        Ok(())
    }
}
