//! The two independent authentication domains.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Which kind of account a caller authenticates as.
///
/// Admins and customers live in separate collections, sign in through
/// separate pages and hold separate session entries. One browser session
/// may be signed in as both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    /// Page an unauthenticated caller is redirected to.
    #[must_use]
    pub const fn login_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin/login",
            Self::Customer => "/customer/login",
        }
    }

    /// Page a freshly signed-in caller lands on.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin/manage-products",
            Self::Customer => "/customer/products",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
        })
    }
}
