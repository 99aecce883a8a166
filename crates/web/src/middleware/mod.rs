//! HTTP middleware for the retail site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (`http_request` span with status and latency)
//! 3. Request ID (record `x-request-id` on the span, echo it on the response)
//! 4. Security headers
//! 5. Session layer (tower-sessions, `PostgreSQL` store in production)
//!
//! Authentication is enforced per handler by the [`RequireAdmin`] and
//! [`RequireCustomer`] extractors rather than by a router-wide guard.

pub mod auth;
pub mod flash;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdmin, RequireCustomer, sign_in, sign_out};
pub use flash::{Flash, set_flash};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, postgres_session_store};
