//! Account error types.

use thiserror::Error;

use abc_retail_core::Role;

use crate::db::StoreError;
use crate::services::credentials::HashError;
use crate::services::validation::FieldErrors;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AccountError {
    /// One or more form fields are invalid.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Another account of the same role already has this username.
    #[error("username already taken")]
    DuplicateUsername,

    /// Document store error.
    #[error("document store error for {role} {account}: {source}")]
    Store {
        role: Role,
        /// Account id, or the username when no id is known yet.
        account: String,
        #[source]
        source: StoreError,
    },

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash(#[from] HashError),
}
