//! Login and logout shared by the admin and customer surfaces.
//!
//! The role-specific handlers only pick the template; checking credentials,
//! writing the session and logging out happen here once.

use axum::response::Redirect;
use serde::Deserialize;
use tower_sessions::Session;

use abc_retail_core::Role;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{sign_in, sign_out};
use crate::models::{CurrentSession, SessionIdentity};
use crate::services::AccountError;
use crate::state::AppState;

/// Shown for both unknown usernames and wrong passwords.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Result of a login attempt that did not fail on a backend.
pub enum LoginOutcome {
    /// Signed in; send the browser to the role's landing page.
    SignedIn(Redirect),
    /// Credentials did not match; re-render the form.
    Rejected,
}

/// Redirect away from a login page when the role is already signed in.
#[must_use]
pub fn redirect_if_signed_in(current: &CurrentSession, role: Role) -> Option<Redirect> {
    current
        .is_signed_in(role)
        .then(|| Redirect::to(role.landing_path()))
}

/// Check credentials for `role` and record the sign-in in the session.
///
/// # Errors
///
/// Returns `AppError` if the store or the session fails.
pub async fn attempt_login(
    state: &AppState,
    session: &Session,
    role: Role,
    form: &LoginForm,
) -> Result<LoginOutcome, AppError> {
    let identity = match state
        .accounts()
        .login(role, &form.username, &form.password)
        .await
    {
        Ok(identity) => identity,
        Err(AccountError::InvalidCredentials) => return Ok(LoginOutcome::Rejected),
        Err(e) => return Err(e.into()),
    };

    sign_in(session, &identity).await?;
    match &identity {
        SessionIdentity::Admin(admin) => set_sentry_user(admin.id.as_str(), &admin.username),
        SessionIdentity::Customer(customer) => {
            set_sentry_user(customer.id.as_str(), &customer.username);
        }
    }

    Ok(LoginOutcome::SignedIn(Redirect::to(role.landing_path())))
}

/// End the session for whichever role asked and return to its login page.
///
/// # Errors
///
/// Returns `AppError::Session` if the session record cannot be deleted.
pub async fn logout(session: &Session, role: Role) -> Result<Redirect, AppError> {
    sign_out(session).await?;
    clear_sentry_user();
    tracing::info!(role = %role, "signed out");
    Ok(Redirect::to(role.login_path()))
}
