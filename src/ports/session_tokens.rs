//! Session token port.
//!
//! Login issues a token; every authenticated request presents it again
//! (cookie or `Authorization: Bearer`). The HTTP middleware only sees this
//! trait, so tests can swap the JWT adapter for a fixed token map.
//!
//! # Contract
//!
//! Implementations must:
//! - Validate the token signature and expiry
//! - Return `AuthError::InvalidToken` for malformed/bad signature tokens
//! - Return `AuthError::TokenExpired` for expired tokens

use chrono::{DateTime, Utc};

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// A freshly issued session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates session tokens.
pub trait SessionTokens: Send + Sync {
    /// Issues a token for a user that just proved its credentials.
    fn issue(&self, user: &AuthenticatedUser) -> Result<IssuedToken, AuthError>;

    /// Validates a raw token (without "Bearer " prefix) and returns its user.
    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a password into a self-describing (PHC) string.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Checks a password against a stored hash.
    ///
    /// A malformed stored hash counts as a mismatch, never as an error the
    /// caller could distinguish.
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}
