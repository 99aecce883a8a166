//! Business logic services.
//!
//! Each service borrows the backends it needs for the duration of a
//! request. Handlers build one, call it, and map its error into a page or
//! an [`crate::error::AppError`].

pub mod accounts;
pub mod catalog;
pub mod credentials;
pub mod ordering;
pub mod validation;

pub use accounts::{AccountError, AccountService, NewAdmin, NewCustomer};
pub use catalog::{CatalogError, CatalogService, ImageUpload, ProductForm};
pub use ordering::{OrderingError, OrderingService};
pub use validation::FieldErrors;
