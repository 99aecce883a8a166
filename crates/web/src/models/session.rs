//! Session-related types for authentication.
//!
//! Types stored in the session for authentication state. Admin and
//! customer identities live under separate keys, so one session can hold
//! both.

use serde::{Deserialize, Serialize};

use abc_retail_core::{AdminId, CustomerId, Role};

/// Session-stored admin identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's document id.
    pub id: AdminId,
    /// Admin's login name.
    pub username: String,
}

/// Session-stored customer identity.
///
/// Carries the display name so pages can greet the customer without a
/// store read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's document id.
    pub id: CustomerId,
    /// Customer's login name.
    pub username: String,
    /// Customer's display name.
    pub name: String,
}

/// Who the caller is signed in as, for each role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentSession {
    pub admin: Option<CurrentAdmin>,
    pub customer: Option<CurrentCustomer>,
}

impl CurrentSession {
    /// Whether the caller is signed in as `role`.
    #[must_use]
    pub const fn is_signed_in(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.admin.is_some(),
            Role::Customer => self.customer.is_some(),
        }
    }
}

/// Result of a successful login, ready to be stored in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdentity {
    Admin(CurrentAdmin),
    Customer(CurrentCustomer),
}

impl SessionIdentity {
    /// Role this identity authenticates.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Admin(_) => Role::Admin,
            Self::Customer(_) => Role::Customer,
        }
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the one-shot message shown after a redirect.
    pub const FLASH: &str = "flash";
}
