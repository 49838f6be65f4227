//! Authentication types for the domain layer.
//!
//! `AuthenticatedUser` is what the HTTP layer hands to handlers after a
//! session token was validated. `AuthError` covers both login and token
//! failures so a single mapping to HTTP exists.

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration with an email that already has an account.
    #[error("An account with this email already exists")]
    EmailAlreadyExists,

    /// Password shorter than the configured minimum.
    #[error("Password must be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    /// Malformed email address.
    #[error("Invalid email address")]
    InvalidEmail,

    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the user no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// Hashing or storage failed.
    #[error("Authentication unavailable: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns true if this error indicates the user should log in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::UserNotFound
        )
    }
}

impl From<super::DomainError> for AuthError {
    fn from(err: super::DomainError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
