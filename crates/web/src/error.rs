//! Unified error handling with Sentry integration.
//!
//! Handlers deal with the recoverable outcomes themselves (validation,
//! wrong password, duplicate username) by re-rendering their form. Anything
//! that escapes as an `AppError` becomes an error page; backend failures are
//! captured to Sentry and logged before a generic message is shown.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::blob::BlobError;
use crate::db::StoreError;
use crate::filters;
use crate::routes::PageContext;
use crate::services::{AccountError, CatalogError, OrderingError};

/// Application-level error type for the retail site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Blob store operation failed.
    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    /// Account operation failed.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Ordering operation failed.
    #[error("Ordering error: {0}")]
    Ordering(#[from] OrderingError),

    /// Session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: PageContext,
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_)
            | Self::Catalog(CatalogError::NotFound(_))
            | Self::Ordering(
                OrderingError::ProductNotFound(_) | OrderingError::CustomerNotFound(_),
            ) => StatusCode::NOT_FOUND,
            Self::BadRequest(_)
            | Self::Account(AccountError::Validation(_))
            | Self::Catalog(CatalogError::Validation(_))
            | Self::Ordering(OrderingError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Account(AccountError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Account(AccountError::DuplicateUsername)
            | Self::Ordering(OrderingError::AlreadyPlaced(_)) => StatusCode::CONFLICT,
            Self::Catalog(CatalogError::ImageUploadFailed(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the visitor.
    fn public_message(&self, status: StatusCode) -> String {
        match status {
            StatusCode::NOT_FOUND => "The page or product you asked for does not exist.".to_string(),
            StatusCode::BAD_REQUEST => match self {
                Self::BadRequest(reason) => reason.clone(),
                _ => "The submitted form was not valid.".to_string(),
            },
            StatusCode::UNAUTHORIZED => "Invalid username or password.".to_string(),
            StatusCode::CONFLICT => "That already exists.".to_string(),
            StatusCode::BAD_GATEWAY => "The image could not be stored. Please try again.".to_string(),
            _ => "Something went wrong on our side. Please try again later.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                source = ?std::error::Error::source(&self).map(ToString::to_string),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = self.public_message(status);
        let template = ErrorTemplate {
            page: PageContext::default(),
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message,
        };

        (status, template).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in account.
pub fn set_sentry_user(id: &str, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("no route".to_string())
}
