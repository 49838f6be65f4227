//! ChangePasswordHandler - replaces the password after checking the current one.

use std::sync::Arc;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::{PasswordHasher, UserRepository};

#[derive(Debug, Clone)]
pub struct ChangePasswordCommand {
    pub user: AuthenticatedUser,
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePasswordHandler {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    min_password_length: usize,
}

impl ChangePasswordHandler {
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

    pub async fn handle(&self, cmd: ChangePasswordCommand) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(&cmd.user.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.hasher.verify(&cmd.current_password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if cmd.new_password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min_length: self.min_password_length,
            });
        }

        let password_hash = self.hasher.hash(&cmd.new_password)?;
        self.users.update_password(&user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}
