//! Application state shared across handlers.

use std::sync::Arc;

use crate::blob::BlobStore;
use crate::config::RetailConfig;
use crate::db::DocumentStore;
use crate::services::{AccountService, CatalogService, OrderingService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Backends are held as trait
/// objects so the same router runs against `PostgreSQL` and Azure in
/// production and in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RetailConfig,
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: RetailConfig,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                documents,
                blobs,
            }),
        }
    }

    /// Get a reference to the retail configuration.
    #[must_use]
    pub fn config(&self) -> &RetailConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn documents(&self) -> &dyn DocumentStore {
        self.inner.documents.as_ref()
    }

    /// Get a reference to the blob store.
    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    /// Account service over this state's document store.
    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(self.documents())
    }

    /// Catalog service over this state's stores.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(
            self.documents(),
            self.blobs(),
            &self.inner.config.image_container,
        )
    }

    /// Ordering service over this state's document store.
    #[must_use]
    pub fn ordering(&self) -> OrderingService<'_> {
        OrderingService::new(self.documents())
    }
}
