//! Customer account model.

use serde::{Deserialize, Serialize};

use abc_retail_core::{CustomerId, Email, Username};

use crate::db::{CUSTOMERS, Document};

/// A registered shopper.
///
/// Orders reference a customer by id and copy the contact details they
/// need, so a customer record is never owned by an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub username: Username,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub name: String,
    pub email: Email,
    pub delivery_address: String,
}

impl Document for Customer {
    const COLLECTION: &'static str = CUSTOMERS;

    fn id(&self) -> &str {
        self.id.as_str()
    }
}
