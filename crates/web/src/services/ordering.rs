//! Ordering service.
//!
//! Orders hold exactly one product. A draft is built from the signed-in
//! customer and the chosen product, shown for confirmation, and then
//! submitted. The customer's identity always comes from the session, never
//! from the submitted form.

use chrono::Utc;
use futures::TryStreamExt;
use thiserror::Error;
use tracing::instrument;

use abc_retail_core::{CustomerId, OrderId, OrderStatus, ProductId};

use crate::db::{Collection, DocumentStore, Filter, PartitionKey, StoreError};
use crate::models::{CurrentCustomer, Customer, Order, Product};
use crate::services::validation::{FieldErrors, required_text};

const MAX_ADDRESS_LENGTH: usize = 500;

/// Errors that can occur while drafting or placing an order.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// The selected product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The session refers to a customer that no longer exists.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The order is incomplete.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// An order with this id has already been placed.
    #[error("order already placed: {0}")]
    AlreadyPlaced(OrderId),

    /// Document store error.
    #[error("document store error for {entity}: {source}")]
    Store {
        /// Collection and id being accessed, e.g. `orders/abc`.
        entity: String,
        #[source]
        source: StoreError,
    },
}

impl OrderingError {
    fn store(collection: &str, id: &str, source: StoreError) -> Self {
        Self::Store {
            entity: format!("{collection}/{id}"),
            source,
        }
    }
}

/// Ordering service.
pub struct OrderingService<'a> {
    products: Collection<'a, Product>,
    customers: Collection<'a, Customer>,
    orders: Collection<'a, Order>,
}

impl<'a> OrderingService<'a> {
    /// Create a new ordering service.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            products: Collection::new(store),
            customers: Collection::new(store),
            orders: Collection::new(store),
        }
    }

    /// Build an unsaved order for one product.
    ///
    /// Contact details are copied from the stored customer record and the
    /// product is copied by value.
    ///
    /// # Errors
    ///
    /// Returns `OrderingError::ProductNotFound` if the product id does not resolve.
    #[instrument(skip(self, customer), fields(product_id = %product_id, customer_id = %customer.id))]
    pub async fn view_order_draft(
        &self,
        product_id: &ProductId,
        customer: &CurrentCustomer,
    ) -> Result<Order, OrderingError> {
        let product = self
            .products
            .get(product_id.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => OrderingError::ProductNotFound(product_id.clone()),
                other => OrderingError::store("products", product_id.as_str(), other),
            })?;

        let record = self
            .customers
            .get(customer.id.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => OrderingError::CustomerNotFound(customer.id.clone()),
                other => OrderingError::store("customers", customer.id.as_str(), other),
            })?;

        Ok(Order {
            id: OrderId::generate(),
            customer_id: record.id,
            customer_name: record.name,
            customer_email: record.email,
            order_date: Utc::now(),
            delivery_address: record.delivery_address,
            product_ids: vec![product.id.clone()],
            products: vec![product],
            status: OrderStatus::Pending,
        })
    }

    /// Persist an order in its customer's partition.
    ///
    /// # Errors
    ///
    /// Returns `OrderingError::Validation` if the order has no product or no address.
    /// Returns `OrderingError::AlreadyPlaced` if the order id is already taken.
    #[instrument(skip(self, order), fields(order_id = %order.id, customer_id = %order.customer_id))]
    pub async fn submit_order(&self, mut order: Order) -> Result<Order, OrderingError> {
        if order.id.as_str().is_empty() {
            order.id = OrderId::generate();
        }

        let mut errors = FieldErrors::new();
        if let Some(address) = required_text(
            &mut errors,
            "delivery_address",
            &order.delivery_address,
            MAX_ADDRESS_LENGTH,
        ) {
            order.delivery_address = address;
        }
        if order.products.is_empty() || order.product_ids.len() != order.products.len() {
            errors.add("product_id", "an order needs a product");
        }
        errors.into_result().map_err(OrderingError::Validation)?;

        self.orders.create(&order).await.map_err(|e| match e {
            StoreError::Conflict(_) => OrderingError::AlreadyPlaced(order.id.clone()),
            other => OrderingError::store("orders", order.id.as_str(), other),
        })?;

        tracing::info!("order placed");
        Ok(order)
    }

    /// Every order placed by one customer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderingError::Store` if the query fails.
    pub async fn orders_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, OrderingError> {
        self.orders
            .query(Filter::Partition(PartitionKey::new(customer_id.as_str())))
            .try_collect()
            .await
            .map_err(|e| OrderingError::store("orders", customer_id.as_str(), e))
    }
}
