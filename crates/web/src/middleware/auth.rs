//! Authentication extractors and session helpers.
//!
//! Admin and customer sign-ins are stored under separate session keys, so a
//! browser can hold both at once. Handlers state what they need by taking
//! [`RequireAdmin`], [`RequireCustomer`] or a plain [`CurrentSession`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use abc_retail_core::Role;

use crate::models::{CurrentAdmin, CurrentCustomer, CurrentSession, SessionIdentity, session_keys};

/// Extractor that requires an admin sign-in.
///
/// Redirects to `/admin/login` when the session holds no admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", admin.username)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// Extractor that requires a customer sign-in.
///
/// Redirects to `/customer/login` when the session holds no customer.
pub struct RequireCustomer(pub CurrentCustomer);

/// Error returned when a role is required but not signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Send the browser to the role's login page.
    RedirectToLogin(Role),
    /// The session layer is not installed on this route.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(role) => Redirect::to(role.login_path()).into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

async fn stored<T: serde::de::DeserializeOwned>(session: &Session, key: &str) -> Option<T> {
    // Unreadable entries count as signed out
    session.get::<T>(key).await.ok().flatten()
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        stored::<CurrentAdmin>(session, session_keys::CURRENT_ADMIN)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin(Role::Admin))
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        stored::<CurrentCustomer>(session, session_keys::CURRENT_CUSTOMER)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin(Role::Customer))
    }
}

/// Who is signed in, for pages that render for everyone.
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        Ok(Self {
            admin: stored(session, session_keys::CURRENT_ADMIN).await,
            customer: stored(session, session_keys::CURRENT_CUSTOMER).await,
        })
    }
}

/// Record a successful login in the session.
///
/// The session id is cycled first so a pre-login cookie cannot be reused.
/// Only the key for the identity's role is written.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(
    session: &Session,
    identity: &SessionIdentity,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    match identity {
        SessionIdentity::Admin(admin) => session.insert(session_keys::CURRENT_ADMIN, admin).await,
        SessionIdentity::Customer(customer) => {
            session
                .insert(session_keys::CURRENT_CUSTOMER, customer)
                .await
        }
    }
}

/// Log out: drop the whole session, whichever role asked.
///
/// # Errors
///
/// Returns an error if the session record cannot be deleted.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
