//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! # Password from the environment (preferred, keeps it out of shell history)
//! RETAIL_ADMIN_PASSWORD=... abc-cli admin create --username alice
//!
//! # Password on the command line
//! abc-cli admin create --username alice --password 's3cret!'
//! ```
//!
//! # Environment Variables
//!
//! - `RETAIL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `RETAIL_ADMIN_PASSWORD` - Password used when `--password` is omitted

use abc_retail_web::db::PgDocumentStore;
use abc_retail_web::services::{AccountError, AccountService, NewAdmin};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No password given on the command line or in the environment.
    #[error("Missing password: pass --password or set RETAIL_ADMIN_PASSWORD")]
    MissingPassword,

    /// Could not reach the database.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// An admin with this username already exists.
    #[error("Admin already exists: {0}")]
    AlreadyExists(String),

    /// Registration rejected the username or password, or the store failed.
    #[error("Could not create admin: {0}")]
    Account(AccountError),
}

/// Register a new admin through the same rules as the registration page.
///
/// # Errors
///
/// Returns an error if the password is missing, the input is invalid, the
/// username is taken, or the database fails.
pub async fn create_admin(
    username: &str,
    password: Option<SecretString>,
) -> Result<(), AdminError> {
    let password = password.ok_or(AdminError::MissingPassword)?;

    let pool = connect().await?;
    let store = PgDocumentStore::new(pool);

    let form = NewAdmin {
        username: username.to_string(),
        password: password.expose_secret().to_string(),
    };

    let admin = AccountService::new(&store)
        .register_admin(&form)
        .await
        .map_err(|e| match e {
            AccountError::DuplicateUsername => {
                AdminError::AlreadyExists(username.trim().to_string())
            }
            e => AdminError::Account(e),
        })?;

    tracing::info!(admin_id = %admin.id, username = %admin.username, "Admin created");
    Ok(())
}
