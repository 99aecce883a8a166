//! Password hashing.
//!
//! Argon2id with the crate's default parameters and a random salt per
//! digest. The PHC string returned by [`hash_password`] is the only form in
//! which a password is ever stored.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Hashing failed inside the Argon2 implementation.
#[derive(Debug, Error)]
#[error("password hashing failed")]
pub struct HashError;

/// Digest verified when the requested account does not exist, so that a
/// failed lookup costs the same as a failed password check.
static DUMMY_DIGEST: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("not-a-real-password").ok());

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `HashError` if Argon2 rejects its inputs.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| HashError)
}

/// Verify a password against a stored digest.
///
/// A malformed digest never verifies.
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(digest) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn one verification's worth of work. Always returns `false`.
#[must_use]
pub fn verify_against_dummy(password: &str) -> bool {
    if let Some(digest) = DUMMY_DIGEST.as_deref() {
        let _ = verify_password(password, digest);
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let digest = hash_password("secret1").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &digest));
    }

    #[test]
    fn test_wrong_password_fails() {
        let digest = hash_password("secret1").unwrap();
        assert!(!verify_password("secret2", &digest));
        assert!(!verify_password("", &digest));
    }

    #[test]
    fn test_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn test_malformed_digest_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_dummy_never_matches() {
        assert!(!verify_against_dummy("not-a-real-password"));
    }
}
