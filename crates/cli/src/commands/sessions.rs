//! Session maintenance commands.
//!
//! Expired sessions are already ignored when loaded; purging only reclaims
//! the rows.
//!
//! # Usage
//!
//! ```bash
//! abc-cli sessions purge
//! ```

use abc_retail_web::middleware::postgres_session_store;
use thiserror::Error;
use tower_sessions::ExpiredDeletion;

use super::{ConnectError, connect};

/// Errors that can occur during session maintenance.
#[derive(Debug, Error)]
pub enum SessionsError {
    /// Could not reach the database.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The session store failed.
    #[error("Session store error: {0}")]
    Store(#[from] tower_sessions::session_store::Error),
}

/// Delete every session record whose expiry has passed.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn purge() -> Result<(), SessionsError> {
    let pool = connect().await?;

    postgres_session_store(&pool).delete_expired().await?;

    tracing::info!("Expired sessions purged");
    Ok(())
}
