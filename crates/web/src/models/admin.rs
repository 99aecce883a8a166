//! Admin account model.

use serde::{Deserialize, Serialize};

use abc_retail_core::{AdminId, Username};

use crate::db::{ADMINS, Document};

/// A catalog administrator.
///
/// Created once at registration and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: AdminId,
    pub username: Username,
    /// Argon2 PHC string.
    pub password_hash: String,
}

impl Document for Admin {
    const COLLECTION: &'static str = ADMINS;

    fn id(&self) -> &str {
        self.id.as_str()
    }
}
