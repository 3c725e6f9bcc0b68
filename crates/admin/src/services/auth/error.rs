//! Staff authentication error types.

use thiserror::Error;

/// Errors that can occur during staff authentication.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Password too weak to hash for use.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Hashing failed.
    #[error("password hashing failed")]
    PasswordHash,
}
