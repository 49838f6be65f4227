//! Mock session tokens for testing.
//!
//! Lets router tests authenticate with fixed strings instead of signed JWTs.
//!
//! # Example
//!
//! ```ignore
//! use payflow::adapters::auth::MockSessionTokens;
//! use payflow::domain::foundation::{AuthenticatedUser, UserId};
//!
//! let tokens = MockSessionTokens::new()
//!     .with_user("valid-token", AuthenticatedUser::new(UserId::new(), "test@example.com"));
//!
//! assert!(tokens.validate("valid-token").is_ok());
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::{IssuedToken, SessionTokens};

/// Mock session tokens.
///
/// Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
/// `issue` hands out `mock-token-<user id>` and registers it.
#[derive(Debug, Default)]
pub struct MockSessionTokens {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Optional error to return for all validations (for error testing)
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionTokens {
    /// Creates a new empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.write().unwrap().insert(token.into(), user);
        self
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap() = Some(error);
        self
    }

    /// Removes a token, making it invalid.
    pub fn remove_token(&self, token: &str) {
        self.tokens.write().unwrap().remove(token);
    }

    /// Returns the number of registered valid tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.read().unwrap().len()
    }
}

impl SessionTokens for MockSessionTokens {
    fn issue(&self, user: &AuthenticatedUser) -> Result<IssuedToken, AuthError> {
        let token = format!("mock-token-{}", user.id);
        self.tokens
            .write()
            .unwrap()
            .insert(token.clone(), user.clone());
        Ok(IssuedToken {
            token,
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self.force_error.read().unwrap().clone() {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
