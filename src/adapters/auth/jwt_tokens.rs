//! HS256 JWT session tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{IssuedToken, SessionTokens};

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    email: String,
    iat: i64,
    exp: i64,
}

/// Issues and validates session JWTs signed with a shared secret.
pub struct JwtSessionTokens {
    secret: SecretString,
    lifetime: Duration,
}

impl JwtSessionTokens {
    pub fn new(secret: SecretString, lifetime: Duration) -> Self {
        Self { secret, lifetime }
    }
}

impl SessionTokens for JwtSessionTokens {
    fn issue(&self, user: &AuthenticatedUser) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;
        let claims = SessionClaims {
            sub: *user.id.as_uuid(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("token signing failed: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(AuthenticatedUser::new(
            UserId::from_uuid(data.claims.sub),
            data.claims.email,
        ))
    }
}
