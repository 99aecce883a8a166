//! Order model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use abc_retail_core::{CustomerId, Email, OrderId, OrderStatus, ProductId};

use super::Product;
use crate::db::{Document, ORDERS, PartitionKey};

/// A customer's order.
///
/// `product_ids` and `products` are parallel: each product id has a
/// snapshot of the product taken when the order was drafted. Orders are
/// stored in their customer's partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: Email,
    pub order_date: DateTime<Utc>,
    pub delivery_address: String,
    pub product_ids: Vec<ProductId>,
    pub products: Vec<Product>,
    #[serde(default)]
    pub status: OrderStatus,
}

impl Order {
    /// The single product a draft was built for.
    #[must_use]
    pub fn first_product(&self) -> Option<&Product> {
        self.products.first()
    }
}

impl Document for Order {
    const COLLECTION: &'static str = ORDERS;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.customer_id.as_str())
    }
}
