//! In-process document store.
//!
//! Enforces the same id and [`UNIQUE_FIELDS`] constraints as the
//! `PostgreSQL` schema so services behave identically against either backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, Filter, PartitionKey, StoreError, UNIQUE_FIELDS};

#[derive(Debug, Clone)]
struct Entry {
    partition: PartitionKey,
    body: Value,
    seq: u64,
}

/// Document store held in memory. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(String, String), Entry>>,
    next_seq: AtomicU64,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }
}

fn unique_violation(
    documents: &HashMap<(String, String), Entry>,
    collection: &str,
    id: &str,
    body: &Value,
) -> Option<&'static str> {
    UNIQUE_FIELDS
        .iter()
        .filter(|(c, _)| *c == collection)
        .find_map(|&(_, field)| {
            let value = body.get(field)?.as_str()?;
            documents
                .iter()
                .any(|((c, other_id), entry)| {
                    c == collection
                        && other_id != id
                        && entry.body.get(field).and_then(Value::as_str) == Some(value)
                })
                .then_some(field)
        })
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
        body: Value,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let key = (collection.to_owned(), id.to_owned());

        if documents.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{collection} document {id} already exists"
            )));
        }
        if let Some(field) = unique_violation(&documents, collection, id, &body) {
            return Err(StoreError::Conflict(format!(
                "{collection} document with this {field} already exists"
            )));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        documents.insert(
            key,
            Entry {
                partition: partition.clone(),
                body,
                seq,
            },
        );
        Ok(())
    }

    async fn read(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
    ) -> Result<Value, StoreError> {
        let documents = self.documents.read().await;
        documents
            .get(&(collection.to_owned(), id.to_owned()))
            .filter(|entry| entry.partition == *partition)
            .map(|entry| entry.body.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
        body: Value,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;

        if let Some(field) = unique_violation(&documents, collection, id, &body) {
            return Err(StoreError::Conflict(format!(
                "{collection} document with this {field} already exists"
            )));
        }

        let entry = documents
            .get_mut(&(collection.to_owned(), id.to_owned()))
            .filter(|entry| entry.partition == *partition)
            .ok_or(StoreError::NotFound)?;
        entry.body = body;
        Ok(())
    }

    async fn delete(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let key = (collection.to_owned(), id.to_owned());

        match documents.get(&key) {
            Some(entry) if entry.partition == *partition => {
                documents.remove(&key);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    fn query<'a>(
        &'a self,
        collection: &'a str,
        filter: Filter,
    ) -> BoxStream<'a, Result<Value, StoreError>> {
        Box::pin(async_stream::stream! {
            let mut matches: Vec<(u64, Value)> = {
                let documents = self.documents.read().await;
                documents
                    .iter()
                    .filter(|((c, _), entry)| {
                        c == collection && filter.matches(&entry.partition, &entry.body)
                    })
                    .map(|(_, entry)| (entry.seq, entry.body.clone()))
                    .collect()
            };
            matches.sort_by_key(|(seq, _)| *seq);

            for (_, body) in matches {
                yield Ok::<Value, StoreError>(body);
            }
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;

    use super::*;

    fn pk(key: &str) -> PartitionKey {
        PartitionKey::new(key)
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let store = MemoryDocumentStore::new();
        store
            .create("products", "p1", &pk("p1"), json!({"id": "p1", "name": "Lamp"}))
            .await
            .unwrap();

        let body = store.read("products", "p1", &pk("p1")).await.unwrap();
        assert_eq!(body["name"], "Lamp");
        assert_eq!(store.count("products").await, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_id_conflicts() {
        let store = MemoryDocumentStore::new();
        store
            .create("products", "p1", &pk("p1"), json!({}))
            .await
            .unwrap();
        let result = store.create("products", "p1", &pk("p1"), json!({})).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_same_id_in_different_collections() {
        let store = MemoryDocumentStore::new();
        store.create("a", "x", &pk("x"), json!({})).await.unwrap();
        store.create("b", "x", &pk("x"), json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_username_enforced() {
        let store = MemoryDocumentStore::new();
        store
            .create("customers", "c1", &pk("c1"), json!({"username": "alice"}))
            .await
            .unwrap();

        let result = store
            .create("customers", "c2", &pk("c2"), json!({"username": "alice"}))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // Unique per collection, not across collections
        store
            .create("admins", "a1", &pk("a1"), json!({"username": "alice"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_read_wrong_partition_is_not_found() {
        let store = MemoryDocumentStore::new();
        store
            .create("orders", "o1", &pk("cust-1"), json!({"id": "o1"}))
            .await
            .unwrap();

        assert!(matches!(
            store.read("orders", "o1", &pk("o1")).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.read("orders", "o1", &pk("cust-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let result = store.replace("products", "nope", &pk("nope"), json!({})).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_replace_overwrites_body() {
        let store = MemoryDocumentStore::new();
        store
            .create("products", "p1", &pk("p1"), json!({"name": "old"}))
            .await
            .unwrap();
        store
            .replace("products", "p1", &pk("p1"), json!({"name": "new"}))
            .await
            .unwrap();

        let body = store.read("products", "p1", &pk("p1")).await.unwrap();
        assert_eq!(body["name"], "new");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryDocumentStore::new();
        store
            .create("products", "p1", &pk("p1"), json!({}))
            .await
            .unwrap();

        store.delete("products", "p1", &pk("p1")).await.unwrap();
        assert!(matches!(
            store.read("products", "p1", &pk("p1")).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete("products", "p1", &pk("p1")).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_query_preserves_insertion_order() {
        let store = MemoryDocumentStore::new();
        for id in ["c", "a", "b"] {
            store
                .create("products", id, &pk(id), json!({"id": id}))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .query("products", Filter::All)
            .map_ok(|body| body["id"].as_str().unwrap().to_string())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, ["c", "a", "b"]);
    }
}
