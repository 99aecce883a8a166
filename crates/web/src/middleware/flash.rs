//! One-shot messages carried across a redirect.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::session_keys;

/// Message left by the previous request, removed from the session on read.
#[derive(Debug, Default)]
pub struct Flash(pub Option<String>);

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };

        let message = session
            .remove::<String>(session_keys::FLASH)
            .await
            .ok()
            .flatten();
        Ok(Self(message))
    }
}

/// Leave a message for the next page the browser loads.
///
/// Failure is logged and otherwise ignored; the redirect still happens.
pub async fn set_flash(session: &Session, message: impl Into<String>) {
    if let Err(e) = session.insert(session_keys::FLASH, message.into()).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}
