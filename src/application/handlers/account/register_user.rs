//! RegisterUserHandler - creates an account from email and password.

use std::sync::Arc;

use crate::domain::account::{normalize_email, User};
use crate::domain::foundation::{AuthError, ErrorCode};
use crate::ports::{PasswordHasher, UserRepository};

#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub email: String,
    pub password: String,
}

/// The freshly created account.
pub type RegisterUserResult = User;

pub struct RegisterUserHandler {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    min_password_length: usize,
}

impl RegisterUserHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        min_password_length: usize,
    ) -> Self {
        Self {
            users,
            hasher,
            min_password_length,
        }
    }

    pub async fn handle(&self, cmd: RegisterUserCommand) -> Result<RegisterUserResult, AuthError> {
        let email = normalize_email(&cmd.email).map_err(|_| AuthError::InvalidEmail)?;
        if cmd.password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min_length: self.min_password_length,
            });
        }

        if self.users.exists_by_email(&email).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = self.hasher.hash(&cmd.password)?;
        let user = User::new(email, password_hash);

        // A concurrent registration can still win between the check and the insert.
        self.users.create(&user).await.map_err(|e| match e.code {
            ErrorCode::UserExists => AuthError::EmailAlreadyExists,
            _ => AuthError::from(e),
        })?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }
}
