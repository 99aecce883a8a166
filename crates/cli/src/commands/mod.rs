//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod sessions;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by commands that only need a database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Neither database variable is set.
    #[error("Missing environment variable: RETAIL_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the retail database named by `RETAIL_DATABASE_URL`, falling
/// back to `DATABASE_URL`.
///
/// Loads `.env` first. Unlike the web binary this does not need the rest of
/// the site configuration.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("RETAIL_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to retail database...");
    Ok(abc_retail_web::db::create_pool(&database_url).await?)
}
