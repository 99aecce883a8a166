//! Session middleware configuration.
//!
//! Sessions expire after 30 minutes without a request. Production uses the
//! `retail.session` table; tests plug in `tower_sessions::MemoryStore`.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::RetailConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "abc_session";

/// Idle time after which a session is discarded.
const SESSION_INACTIVITY_SECONDS: i64 = 30 * 60;

/// `PostgreSQL` session store in the `retail` schema.
///
/// # Panics
///
/// Panics if the schema name or table name is invalid (should never happen
/// with hardcoded "retail" and "session" values).
#[must_use]
pub fn postgres_session_store(pool: &PgPool) -> PostgresStore {
    // The session table must be created via migration in the retail schema
    PostgresStore::new(pool.clone())
        .with_schema_name("retail")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name")
}

/// Create the session layer over any session store.
///
/// # Arguments
///
/// * `store` - Backing session store
/// * `config` - Retail configuration (for determining HTTPS mode)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &RetailConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_INACTIVITY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
