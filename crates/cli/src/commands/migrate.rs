//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! abc-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RETAIL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Could not reach the database.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration from `crates/web/migrations`.
///
/// The migrations create the `retail` schema, the document table with its
/// username indexes, and the session table.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running retail migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Retail migrations complete!");
    Ok(())
}
