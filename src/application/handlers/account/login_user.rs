//! LoginUserHandler - checks credentials and issues a session token.
//!
//! Unknown emails still pay for one hash verification against a throwaway
//! hash, so response time does not reveal which emails have accounts.

use std::sync::Arc;

use crate::domain::account::normalize_email;
use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::{IssuedToken, PasswordHasher, SessionTokens, UserRepository};

const TIMING_PASSWORD: &str = "timing-equalizer-password";

#[derive(Debug, Clone)]
pub struct LoginUserCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginUserResult {
    pub user: AuthenticatedUser,
    pub token: IssuedToken,
}

pub struct LoginUserHandler {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn SessionTokens>,
    timing_hash: String,
}

impl LoginUserHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn SessionTokens>,
    ) -> Self {
        let timing_hash = hasher.hash(TIMING_PASSWORD).unwrap_or_default();
        Self {
            users,
            hasher,
            tokens,
            timing_hash,
        }
    }

    pub async fn handle(&self, cmd: LoginUserCommand) -> Result<LoginUserResult, AuthError> {
        let user = match normalize_email(&cmd.email) {
            Ok(email) => self.users.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            let _ = self.hasher.verify(&cmd.password, &self.timing_hash);
            tracing::debug!("Login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(&cmd.password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let authenticated = AuthenticatedUser::new(user.id, user.email);
        let token = self.tokens.issue(&authenticated)?;

        tracing::info!(user_id = %authenticated.id, "User logged in");
        Ok(LoginUserResult {
            user: authenticated,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::{Argon2PasswordHasher, MockSessionTokens};
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::account::User;

    async fn setup() -> (InMemoryStore, Arc<MockSessionTokens>, LoginUserHandler) {
        let store = InMemoryStore::new();
        let hasher = Arc::new(Argon2PasswordHasher::new());
        let user = User::new("user@example.com", hasher.hash("password1").unwrap());
        store.users().create(&user).await.unwrap();

        let tokens = Arc::new(MockSessionTokens::new());
        let handler = LoginUserHandler::new(store.users(), hasher, tokens.clone());
        (store, tokens, handler)
    }

    fn command(email: &str, password: &str) -> LoginUserCommand {
        LoginUserCommand {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn valid_credentials_issue_a_token() {
        let (_, tokens, handler) = setup().await;

        let result = handler
            .handle(command("USER@example.com", "password1"))
            .await
            .unwrap();

        assert_eq!(result.user.email, "user@example.com");
        let validated = tokens.validate(&result.token.token).unwrap();
        assert_eq!(validated, result.user);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (_, tokens, handler) = setup().await;

        let err = handler
            .handle(command("user@example.com", "password2"))
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(tokens.token_count(), 0);
    }

    #[tokio::test]
    async fn unknown_email_is_indistinguishable_from_wrong_password() {
        let (_, _, handler) = setup().await;

        let unknown = handler
            .handle(command("nobody@example.com", "password1"))
            .await
            .unwrap_err();
        let malformed = handler
            .handle(command("nobody", "password1"))
            .await
            .unwrap_err();

        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(malformed, AuthError::InvalidCredentials);
    }
}
