//! Staff authentication service.
//!
//! A single staff account is configured through `ADMIN_USERNAME` and an
//! Argon2 PHC hash in `ADMIN_PASSWORD_HASH`. Successful logins produce a
//! [`CurrentAdmin`] for the session.

mod error;

pub use error::AdminAuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use secrecy::ExposeSecret;

use crate::config::AdminCredentials;
use crate::models::CurrentAdmin;

/// Minimum password length accepted by [`hash_password`].
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Staff authentication service.
pub struct AdminAuthService<'a> {
    credentials: &'a AdminCredentials,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(credentials: &'a AdminCredentials) -> Self {
        Self { credentials }
    }

    /// Check a username and password.
    ///
    /// The password is verified even when the username is wrong, so both
    /// failures take the same time.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` on any mismatch.
    pub fn login(&self, username: &str, password: &str) -> Result<CurrentAdmin, AdminAuthError> {
        let password_ok = verify_password(password, self.credentials.password_hash.expose_secret()).is_ok();
        let username_ok = username.trim() == self.credentials.username;

        if !(password_ok && username_ok) {
            return Err(AdminAuthError::InvalidCredentials);
        }

        Ok(CurrentAdmin {
            username: self.credentials.username.clone(),
            logged_in_at: Utc::now(),
        })
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AdminAuthError::WeakPassword` if the password is too short, or
/// `AdminAuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

/// Verify a password against a PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminAuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}
