//! Catalog product model.

use serde::{Deserialize, Serialize};

use abc_retail_core::{Price, ProductId};

use crate::db::{Document, PRODUCTS};

/// A product in the catalog.
///
/// Orders embed a copy of the product as it was when ordered, so later
/// edits and deletes never change an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Absolute URL of the uploaded image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Document for Product {
    const COLLECTION: &'static str = PRODUCTS;

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_document_layout() {
        let product = Product {
            id: ProductId::new("p1"),
            name: "Desk Lamp".to_string(),
            description: "Brass".to_string(),
            price: Price::parse("24.50").unwrap(),
            image_url: None,
        };

        let body = serde_json::to_value(&product).unwrap();
        assert_eq!(body["id"], "p1");
        assert_eq!(body["price"], "24.5");
        assert!(body.get("imageUrl").is_none());
        assert_eq!(product.partition_key().as_str(), "p1");
    }
}
