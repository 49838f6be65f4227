//! UserRepository port - persistence for user accounts.

use async_trait::async_trait;

use crate::domain::account::User;
use crate::domain::billing::BillingAddress;
use crate::domain::foundation::{DomainError, UserId};

/// Port for reading and writing user accounts.
///
/// Emails are stored normalized; callers pass them normalized too.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, DomainError>;

    /// Inserts a new user.
    ///
    /// Fails with `ErrorCode::UserExists` when the email is taken.
    async fn create(&self, user: &User) -> Result<(), DomainError>;

    /// Replaces the password hash. Fails with `ErrorCode::UserNotFound`.
    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), DomainError>;

    /// Stores the billing address entered at checkout.
    async fn update_billing_address(
        &self,
        id: &UserId,
        address: &BillingAddress,
    ) -> Result<(), DomainError>;
}
