//! Domain models.
//!
//! Persisted entities serialize with camelCase field names; that is the
//! document layout in every collection.

pub mod admin;
pub mod customer;
pub mod order;
pub mod product;
pub mod session;

pub use admin::Admin;
pub use customer::Customer;
pub use order::Order;
pub use product::Product;
pub use session::{CurrentAdmin, CurrentCustomer, CurrentSession, SessionIdentity, session_keys};
