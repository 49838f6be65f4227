//! Authentication configuration

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Authentication configuration (local accounts, JWT sessions)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens
    pub jwt_secret: SecretString,

    /// Session lifetime in hours
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,

    /// Minimum accepted password length
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

impl AuthConfig {
    pub fn session_lifetime(&self) -> Duration {
        Duration::hours(self.session_hours)
    }

    /// Validate authentication configuration
    ///
    /// Production requires a long secret; development accepts any non-empty one.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_LEN));
        }
        if !(1..=720).contains(&self.session_hours) {
            return Err(ValidationError::InvalidSessionLifetime);
        }
        if self.min_password_length < 8 {
            return Err(ValidationError::PasswordPolicyTooWeak);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::new(String::new()),
            session_hours: default_session_hours(),
            min_password_length: default_min_password_length(),
        }
    }
}

fn default_session_hours() -> i64 {
    24
}

fn default_min_password_length() -> usize {
    8
}
