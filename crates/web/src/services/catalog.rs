//! Catalog service.
//!
//! Product CRUD for the admin surface and product listing for customers.
//! Creating a product with an image uploads the image first; if the upload
//! fails nothing is written. If the document write fails after a successful
//! upload, the uploaded blob is deleted again.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use abc_retail_core::{Price, ProductId};

use crate::blob::{BlobError, BlobStore, object_name_for};
use crate::db::{Collection, DocumentStore, StoreError};
use crate::models::Product;
use crate::services::validation::{FieldErrors, required_text};

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 4000;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// One or more form fields are invalid.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// No product has this id.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// The image could not be stored; the product was not created.
    #[error("image upload failed: {0}")]
    ImageUploadFailed(#[source] BlobError),

    /// Document store error.
    #[error(
        "document store error for product {}: {source}",
        .product_id.as_ref().map_or("-", ProductId::as_str)
    )]
    Store {
        /// Product being read or written, if a single one was addressed.
        product_id: Option<ProductId>,
        #[source]
        source: StoreError,
    },
}

impl CatalogError {
    fn store(product_id: &ProductId, source: StoreError) -> Self {
        match source {
            StoreError::NotFound => Self::NotFound(product_id.clone()),
            source => Self::Store {
                product_id: Some(product_id.clone()),
                source,
            },
        }
    }
}

/// Product form as submitted. The price is parsed during validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
}

impl ProductForm {
    /// Pre-fill the form from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            // Full precision; the two-place display form would round on save.
            price: product.price.amount().to_string(),
        }
    }

    fn validate(&self) -> Result<(String, String, Price), FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", &self.name, MAX_NAME_LENGTH);
        let description = self.description.trim().to_string();
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            errors.add(
                "description",
                format!("description must be at most {MAX_DESCRIPTION_LENGTH} characters"),
            );
        }
        let price = errors.check("price", Price::parse(&self.price));

        match (name, price) {
            (Some(name), Some(price)) if errors.is_empty() => Ok((name, description, price)),
            _ => Err(errors),
        }
    }
}

/// An uploaded image file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the browser.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: Collection<'a, Product>,
    blobs: &'a dyn BlobStore,
    image_container: &'a str,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service storing images in `image_container`.
    #[must_use]
    pub fn new(
        store: &'a dyn DocumentStore,
        blobs: &'a dyn BlobStore,
        image_container: &'a str,
    ) -> Self {
        Self {
            products: Collection::new(store),
            blobs,
            image_container,
        }
    }

    /// Every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        self.products.all().await.map_err(|source| CatalogError::Store {
            product_id: None,
            source,
        })
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    pub async fn get(&self, id: &ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(id.as_str())
            .await
            .map_err(|e| CatalogError::store(id, e))
    }

    /// Create a product, uploading its image first if one is given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the form is invalid.
    /// Returns `CatalogError::ImageUploadFailed` if the image could not be stored.
    #[instrument(skip(self, form, image), fields(has_image = image.is_some()))]
    pub async fn create(
        &self,
        form: &ProductForm,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let (name, description, price) = form.validate().map_err(CatalogError::Validation)?;

        if let Some(image) = &image
            && !image.content_type.starts_with("image/")
        {
            let mut errors = FieldErrors::new();
            errors.add("image", "image must be an image file");
            return Err(CatalogError::Validation(errors));
        }

        let image_url = match image {
            Some(image) => Some(self.upload_image(image).await?),
            None => None,
        };

        let product = Product {
            id: ProductId::generate(),
            name,
            description,
            price,
            image_url,
        };

        if let Err(source) = self.products.create(&product).await {
            if let Some(url) = &product.image_url
                && let Err(e) = self.blobs.delete(url).await
            {
                tracing::warn!(
                    error = %e,
                    image_url = %url,
                    "failed to remove orphaned product image"
                );
            }
            return Err(CatalogError::store(&product.id, source));
        }

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replace a product's name, description and price. The image is kept.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the form is invalid.
    /// Returns `CatalogError::NotFound` if no product has this id.
    #[instrument(skip(self, form), fields(product_id = %id))]
    pub async fn update(&self, id: &ProductId, form: &ProductForm) -> Result<Product, CatalogError> {
        let (name, description, price) = form.validate().map_err(CatalogError::Validation)?;

        let mut product = self.get(id).await?;
        product.name = name;
        product.description = description;
        product.price = price;

        self.products
            .replace(&product)
            .await
            .map_err(|e| CatalogError::store(id, e))?;

        tracing::info!("product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// The image blob is left in place because existing orders keep a
    /// snapshot that still points at it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: &ProductId) -> Result<(), CatalogError> {
        self.products
            .delete(id.as_str())
            .await
            .map_err(|e| CatalogError::store(id, e))?;

        tracing::info!("product deleted");
        Ok(())
    }

    async fn upload_image(&self, image: ImageUpload) -> Result<String, CatalogError> {
        let object_name = object_name_for(&image.file_name);
        self.blobs
            .upload(
                self.image_container,
                &object_name,
                image.bytes,
                &image.content_type,
            )
            .await
            .map_err(CatalogError::ImageUploadFailed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde_json::Value;

    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::db::{Filter, MemoryDocumentStore, PartitionKey};

    const CONTAINER: &str = "product-images";

    fn lamp() -> ProductForm {
        ProductForm {
            name: "Desk Lamp".to_string(),
            description: "Brass, 40cm".to_string(),
            price: "24.50".to_string(),
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            file_name: "lamp.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"\x89PNG fake".to_vec(),
        }
    }

    /// Blob store whose uploads always fail.
    struct UnreachableBlobs;

    #[async_trait]
    impl BlobStore for UnreachableBlobs {
        async fn ensure_container(&self, _container: &str) -> Result<(), BlobError> {
            Err(BlobError::Rejected { status: 503 })
        }

        async fn put_object(
            &self,
            _container: &str,
            _object_name: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, BlobError> {
            Err(BlobError::Rejected { status: 503 })
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>, BlobError> {
            Err(BlobError::NotFound)
        }

        async fn delete(&self, _url: &str) -> Result<(), BlobError> {
            Err(BlobError::NotFound)
        }
    }

    /// Document store that refuses every write.
    struct ReadOnlyStore(MemoryDocumentStore);

    #[async_trait]
    impl DocumentStore for ReadOnlyStore {
        async fn create(
            &self,
            _collection: &str,
            _id: &str,
            _partition: &PartitionKey,
            _body: Value,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        async fn read(
            &self,
            collection: &str,
            id: &str,
            partition: &PartitionKey,
        ) -> Result<Value, StoreError> {
            self.0.read(collection, id, partition).await
        }

        async fn replace(
            &self,
            _collection: &str,
            _id: &str,
            _partition: &PartitionKey,
            _body: Value,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        async fn delete(
            &self,
            _collection: &str,
            _id: &str,
            _partition: &PartitionKey,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        fn query<'a>(
            &'a self,
            collection: &'a str,
            filter: Filter,
        ) -> BoxStream<'a, Result<Value, StoreError>> {
            self.0.query(collection, filter)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_without_image() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);

        let product = catalog.create(&lamp(), None).await.unwrap();
        assert!(product.image_url.is_none());
        assert_eq!(product.price.to_string(), "24.50");

        let fetched = catalog.get(&product.id).await.unwrap();
        assert_eq!(fetched, product);
        assert_eq!(blobs.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_with_image() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);

        let product = catalog.create(&lamp(), Some(png())).await.unwrap();
        let url = product.image_url.unwrap();
        assert!(url.ends_with("_lamp.png"));
        assert!(blobs.has_container(CONTAINER).await);
        assert_eq!(blobs.download(&url).await.unwrap(), b"\x89PNG fake");
        assert_eq!(blobs.get(&url).await.unwrap().content_type, "image/png");
    }

    #[tokio::test]
    async fn test_image_upload_failure_aborts_create() {
        let store = MemoryDocumentStore::new();
        let catalog = CatalogService::new(&store, &UnreachableBlobs, CONTAINER);

        let result = catalog.create(&lamp(), Some(png())).await;
        assert!(matches!(result, Err(CatalogError::ImageUploadFailed(_))));
        assert_eq!(store.count("products").await, 0);
    }

    #[tokio::test]
    async fn test_failed_write_removes_uploaded_image() {
        let store = ReadOnlyStore(MemoryDocumentStore::new());
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);

        let result = catalog.create(&lamp(), Some(png())).await;
        assert!(matches!(result, Err(CatalogError::Store { .. })));
        assert_eq!(blobs.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejects_non_image_upload() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);

        let mut upload = png();
        upload.content_type = "application/pdf".to_string();
        let Err(CatalogError::Validation(errors)) = catalog.create(&lamp(), Some(upload)).await
        else {
            panic!("expected validation error");
        };
        assert!(errors.get("image").is_some());
        assert_eq!(blobs.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_validation() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);

        let form = ProductForm {
            name: String::new(),
            description: String::new(),
            price: "-1".to_string(),
        };
        let Err(CatalogError::Validation(errors)) = catalog.create(&form, None).await else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("name"), Some("name is required"));
        assert_eq!(errors.get("price"), Some("price cannot be negative"));
    }

    #[tokio::test]
    async fn test_update_keeps_image() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);
        let product = catalog.create(&lamp(), Some(png())).await.unwrap();

        let mut form = ProductForm::from_product(&product);
        form.name = "Floor Lamp".to_string();
        form.price = "99".to_string();
        let updated = catalog.update(&product.id, &form).await.unwrap();

        assert_eq!(updated.name, "Floor Lamp");
        assert_eq!(updated.image_url, product.image_url);
        assert_eq!(catalog.get(&product.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_rename_keeps_exact_price() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);
        let mut form = lamp();
        form.price = "0.125".to_string();
        let product = catalog.create(&form, None).await.unwrap();

        let mut edit = ProductForm::from_product(&product);
        assert_eq!(edit.price, "0.125");
        edit.name = "Reading Lamp".to_string();
        catalog.update(&product.id, &edit).await.unwrap();

        let stored = catalog.get(&product.id).await.unwrap();
        assert_eq!(stored.name, "Reading Lamp");
        assert_eq!(stored.price, product.price);
        assert_eq!(stored.price, Price::parse("0.125").unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);

        let result = catalog.update(&ProductId::new("missing"), &lamp()).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);
        let product = catalog.create(&lamp(), None).await.unwrap();

        catalog.delete(&product.id).await.unwrap();
        assert!(matches!(
            catalog.get(&product.id).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete(&product.id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list() {
        let store = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let catalog = CatalogService::new(&store, &blobs, CONTAINER);
        assert!(catalog.list().await.unwrap().is_empty());

        catalog.create(&lamp(), None).await.unwrap();
        catalog.create(&lamp(), None).await.unwrap();
        assert_eq!(catalog.list().await.unwrap().len(), 2);
    }
}
