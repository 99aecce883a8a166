//! `PostgreSQL` document store.
//!
//! All collections share the `retail.document` table. Bodies are JSONB so
//! single-field equality filters run as `body ->> field = value`.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{DocumentStore, Filter, PartitionKey, StoreError};

const SELECT_MATCHING: &str = r"
    SELECT body
    FROM retail.document
    WHERE collection = $1
      AND ($2::text IS NULL OR partition_key = $2)
      AND ($3::text IS NULL OR body ->> $3 = $4)
    ORDER BY created_at, id
";

/// Document store backed by the `retail.document` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
        body: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO retail.document (collection, id, partition_key, body)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(partition.as_str())
        .bind(Json(body))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(format!(
                    "{collection} document violates {}",
                    db_err.constraint().unwrap_or("a unique constraint")
                ));
            }
            StoreError::Unavailable(e)
        })?;

        Ok(())
    }

    async fn read(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
    ) -> Result<Value, StoreError> {
        let body: Option<Json<Value>> = sqlx::query_scalar(
            r"
            SELECT body
            FROM retail.document
            WHERE collection = $1 AND id = $2 AND partition_key = $3
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(partition.as_str())
        .fetch_optional(&self.pool)
        .await?;

        body.map(|Json(body)| body).ok_or(StoreError::NotFound)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
        body: Value,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE retail.document
            SET body = $4, updated_at = NOW()
            WHERE collection = $1 AND id = $2 AND partition_key = $3
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(partition.as_str())
        .bind(Json(body))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(format!(
                    "{collection} document violates a unique constraint"
                ));
            }
            StoreError::Unavailable(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(
        &self,
        collection: &str,
        id: &str,
        partition: &PartitionKey,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM retail.document
            WHERE collection = $1 AND id = $2 AND partition_key = $3
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(partition.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn query<'a>(
        &'a self,
        collection: &'a str,
        filter: Filter,
    ) -> BoxStream<'a, Result<Value, StoreError>> {
        let (partition, field, value) = match filter {
            Filter::All => (None, None, None),
            Filter::Partition(key) => (Some(key.0), None, None),
            Filter::FieldEq { field, value } => (None, Some(field), Some(value)),
        };

        sqlx::query_scalar::<_, Json<Value>>(SELECT_MATCHING)
            .bind(collection)
            .bind(partition)
            .bind(field)
            .bind(value)
            .fetch(&self.pool)
            .map_ok(|Json(body)| body)
            .map_err(StoreError::from)
            .boxed()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
