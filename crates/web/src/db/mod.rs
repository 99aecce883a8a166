//! Document store gateway.
//!
//! Every entity is persisted as a JSON document in a named collection,
//! addressed by `(collection, id)` and routed by a partition key. Admins,
//! customers and products are partitioned by their own id; orders are
//! partitioned by the owning customer's id so that a customer's orders can
//! be listed with a single-partition query.
//!
//! # Backends
//!
//! - [`PgDocumentStore`] - one `retail.document` table holding JSONB bodies
//! - [`MemoryDocumentStore`] - process-local store for tests and local runs
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p abc-retail-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Collection holding [`crate::models::Admin`] documents.
pub const ADMINS: &str = "admins";
/// Collection holding [`crate::models::Customer`] documents.
pub const CUSTOMERS: &str = "customers";
/// Collection holding [`crate::models::Product`] documents.
pub const PRODUCTS: &str = "products";
/// Collection holding [`crate::models::Order`] documents.
pub const ORDERS: &str = "orders";

/// `(collection, body field)` pairs that must be unique within the collection.
///
/// Mirrored by partial unique indexes in the initial migration.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[(ADMINS, "username"), (CUSTOMERS, "username")];

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with that id exists in the addressed partition.
    #[error("document not found")]
    NotFound,

    /// A document with the same id or unique field already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing service failed or could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A stored body does not decode into the expected type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Routing key a document is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Create a partition key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query predicate over one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// Every document stored under one partition key.
    Partition(PartitionKey),
    /// Documents whose top-level string field equals `value`.
    FieldEq {
        /// Body field name.
        field: &'static str,
        /// Exact value to match.
        value: String,
    },
}

impl Filter {
    /// Single-field equality filter.
    #[must_use]
    pub fn field_eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::FieldEq {
            field,
            value: value.into(),
        }
    }

    /// Whether a stored document satisfies this filter.
    #[must_use]
    pub fn matches(&self, partition: &PartitionKey, body: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Partition(key) => key == partition,
            Self::FieldEq { field, value } => {
                body.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
        }
    }
}

/// An entity that lives in a document collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the collection holding this entity.
    const COLLECTION: &'static str;

    /// Document id, unique within the collection.
    fn id(&self) -> &str;

    /// Partition key the document is stored under. Defaults to the id.
    fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.id())
    }
}

/// Untyped document storage over JSON bodies.
///
/// Operations are exact-match by `(collection, id, partition)`. There are
/// no transactions and nothing is retried.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document.
    ///
    /// Fails with [`StoreError::Conflict`] if the id or a unique field is taken.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
        body: Value,
    ) -> Result<(), StoreError>;

    /// Fetch a document body.
    async fn read(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
    ) -> Result<Value, StoreError>;

    /// Overwrite an existing document body.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
        body: Value,
    ) -> Result<(), StoreError>;

    /// Remove a document.
    async fn delete(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
    ) -> Result<(), StoreError>;

    /// Lazily stream the bodies matching `filter`, oldest first.
    fn query<'a>(
        &'a self,
        collection: &'a str,
        filter: Filter,
    ) -> BoxStream<'a, Result<Value, StoreError>>;

    /// Check that the backing service is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<'a, T> {
    store: &'a dyn DocumentStore,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Document> Collection<'a, T> {
    /// Bind a typed collection to a store.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Insert a new document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the id or a unique field is taken.
    pub async fn create(&self, doc: &T) -> Result<(), StoreError> {
        self.store
            .create(T::COLLECTION, doc.id(), &doc.partition_key(), encode(doc)?)
            .await
    }

    /// Fetch a document whose partition key is its own id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no document has that id.
    pub async fn get(&self, id: &str) -> Result<T, StoreError> {
        self.get_in(id, &PartitionKey::new(id)).await
    }

    /// Fetch a document from an explicit partition.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the partition holds no such id.
    pub async fn get_in(&self, id: &str, partition: &PartitionKey) -> Result<T, StoreError> {
        let body = self.store.read(T::COLLECTION, id, partition).await?;
        decode(body)
    }

    /// Overwrite an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the document does not exist.
    pub async fn replace(&self, doc: &T) -> Result<(), StoreError> {
        self.store
            .replace(T::COLLECTION, doc.id(), &doc.partition_key(), encode(doc)?)
            .await
    }

    /// Remove a document whose partition key is its own id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no document has that id.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store
            .delete(T::COLLECTION, id, &PartitionKey::new(id))
            .await
    }

    /// Lazily stream the documents matching `filter`.
    #[must_use]
    pub fn query(&self, filter: Filter) -> BoxStream<'a, Result<T, StoreError>> {
        self.store
            .query(T::COLLECTION, filter)
            .and_then(|body| async move { decode::<T>(body) })
            .boxed()
    }

    /// First document whose `field` equals `value`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a body does not decode.
    pub async fn find_first(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<Option<T>, StoreError> {
        let mut matches = self.query(Filter::field_eq(field, value));
        matches.try_next().await
    }

    /// Every document in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a body does not decode.
    pub async fn all(&self) -> Result<Vec<T>, StoreError> {
        self.query(Filter::All).try_collect().await
    }
}

fn encode<T: Serialize>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc)
        .map_err(|e| StoreError::DataCorruption(format!("failed to encode document: {e}")))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, StoreError> {
    serde_json::from_value(body)
        .map_err(|e| StoreError::DataCorruption(format!("invalid document in store: {e}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
