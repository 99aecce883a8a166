//! Account service.
//!
//! Registration and login for both roles. Admins and customers are kept in
//! separate collections but go through the same rules: a unique username
//! of 3-50 characters and a password of 6-100 characters, stored only as an
//! Argon2 digest.

mod error;

pub use error::AccountError;

use serde::Deserialize;
use tracing::instrument;

use abc_retail_core::{AdminId, CustomerId, Email, Role, Username};

use crate::db::{Collection, DocumentStore, StoreError};
use crate::models::{Admin, CurrentAdmin, CurrentCustomer, Customer, SessionIdentity};
use crate::services::credentials::{hash_password, verify_against_dummy, verify_password};
use crate::services::validation::{FieldErrors, required_text};

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Maximum password length in characters.
pub const MAX_PASSWORD_LENGTH: usize = 100;

const MAX_NAME_LENGTH: usize = 100;
const MAX_ADDRESS_LENGTH: usize = 500;

/// Admin registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
}

/// Customer registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub delivery_address: String,
}

/// Account service.
///
/// Handles registration and password login for admins and customers.
pub struct AccountService<'a> {
    admins: Collection<'a, Admin>,
    customers: Collection<'a, Customer>,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            admins: Collection::new(store),
            customers: Collection::new(store),
        }
    }

    /// Register a new admin.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` if the username or password is malformed.
    /// Returns `AccountError::DuplicateUsername` if another admin has the username.
    #[instrument(skip(self, form), fields(username = %form.username.trim()))]
    pub async fn register_admin(&self, form: &NewAdmin) -> Result<Admin, AccountError> {
        let mut errors = FieldErrors::new();
        let username = errors.check("username", Username::parse(&form.username));
        validate_password(&mut errors, &form.password);
        errors.into_result().map_err(AccountError::Validation)?;
        let Some(username) = username else {
            return Err(AccountError::Validation(FieldErrors::new()));
        };

        if self
            .admins
            .find_first("username", username.as_str())
            .await
            .map_err(store_error(Role::Admin, username.as_str()))?
            .is_some()
        {
            return Err(AccountError::DuplicateUsername);
        }

        let admin = Admin {
            id: AdminId::generate(),
            username,
            password_hash: hash_password(&form.password)?,
        };
        self.admins
            .create(&admin)
            .await
            .map_err(|e| duplicate_or_store(Role::Admin, admin.id.as_str(), e))?;

        tracing::info!(admin_id = %admin.id, "admin registered");
        Ok(admin)
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` if any field is malformed.
    /// Returns `AccountError::DuplicateUsername` if another customer has the username.
    #[instrument(skip(self, form), fields(username = %form.username.trim()))]
    pub async fn register_customer(&self, form: &NewCustomer) -> Result<Customer, AccountError> {
        let mut errors = FieldErrors::new();
        let username = errors.check("username", Username::parse(&form.username));
        validate_password(&mut errors, &form.password);
        let name = required_text(&mut errors, "name", &form.name, MAX_NAME_LENGTH);
        let email = errors.check("email", Email::parse(&form.email));
        let delivery_address = required_text(
            &mut errors,
            "delivery_address",
            &form.delivery_address,
            MAX_ADDRESS_LENGTH,
        );
        errors.into_result().map_err(AccountError::Validation)?;

        let (Some(username), Some(name), Some(email), Some(delivery_address)) =
            (username, name, email, delivery_address)
        else {
            return Err(AccountError::Validation(FieldErrors::new()));
        };

        if self
            .customers
            .find_first("username", username.as_str())
            .await
            .map_err(store_error(Role::Customer, username.as_str()))?
            .is_some()
        {
            return Err(AccountError::DuplicateUsername);
        }

        let customer = Customer {
            id: CustomerId::generate(),
            username,
            password_hash: hash_password(&form.password)?,
            name,
            email,
            delivery_address,
        };
        self.customers
            .create(&customer)
            .await
            .map_err(|e| duplicate_or_store(Role::Customer, customer.id.as_str(), e))?;

        tracing::info!(customer_id = %customer.id, "customer registered");
        Ok(customer)
    }

    /// Check a username and password for `role`.
    ///
    /// Unknown usernames cost one dummy hash verification so both failure
    /// modes take comparable time.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` if no account of that role
    /// has the username or the password does not match.
    #[instrument(skip(self, username, password), fields(role = %role))]
    pub async fn login(
        &self,
        role: Role,
        username: &str,
        password: &str,
    ) -> Result<SessionIdentity, AccountError> {
        let username = username.trim();

        let identity = match role {
            Role::Admin => self
                .admins
                .find_first("username", username)
                .await
                .map_err(store_error(role, username))?
                .map(|admin| {
                    let digest = admin.password_hash;
                    let identity = SessionIdentity::Admin(CurrentAdmin {
                        id: admin.id,
                        username: admin.username.into(),
                    });
                    (digest, identity)
                }),
            Role::Customer => self
                .customers
                .find_first("username", username)
                .await
                .map_err(store_error(role, username))?
                .map(|customer| {
                    let digest = customer.password_hash;
                    let identity = SessionIdentity::Customer(CurrentCustomer {
                        id: customer.id,
                        username: customer.username.into(),
                        name: customer.name,
                    });
                    (digest, identity)
                }),
        };

        match identity {
            Some((digest, identity)) if verify_password(password, &digest) => {
                tracing::info!("login succeeded");
                Ok(identity)
            }
            Some(_) => {
                tracing::info!("login rejected");
                Err(AccountError::InvalidCredentials)
            }
            None => {
                let _ = verify_against_dummy(password);
                tracing::info!("login rejected");
                Err(AccountError::InvalidCredentials)
            }
        }
    }
}

fn validate_password(errors: &mut FieldErrors, password: &str) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    } else if len > MAX_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("password must be at most {MAX_PASSWORD_LENGTH} characters"),
        );
    }
}

fn store_error(role: Role, account: &str) -> impl FnOnce(StoreError) -> AccountError + '_ {
    move |source| AccountError::Store {
        role,
        account: account.to_string(),
        source,
    }
}

/// The unique username index closes the race between lookup and insert.
fn duplicate_or_store(role: Role, account: &str, e: StoreError) -> AccountError {
    match e {
        StoreError::Conflict(_) => AccountError::DuplicateUsername,
        other => store_error(role, account)(other),
    }
}
