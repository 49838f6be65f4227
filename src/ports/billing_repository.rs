//! BillingRepository port - the record store behind webhook reconciliation.
//!
//! Every webhook is applied inside one unit of work: the dedup marker and all
//! state mutations commit together or not at all. Stripe delivers at least
//! once, so this is what turns redelivery into a no-op without ever losing an
//! event to a half-applied write.
//!
//! ## Contract
//!
//! - `mark_event_processed` must be atomic against concurrent deliveries of
//!   the same event id (PRIMARY KEY + `ON CONFLICT DO NOTHING` in Postgres).
//! - Dropping a unit of work without `commit` discards every write in it,
//!   the dedup marker included.

use async_trait::async_trait;

use crate::domain::account::User;
use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, UserId};

/// Result of attempting to record an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate event).
    AlreadyExists,
}

/// Entry point of the billing store.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Opens a unit of work. Writes become visible on `commit`.
    async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError>;

    /// Subscriptions owned by a user, newest first.
    async fn list_subscriptions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError>;
}

/// Transactional view of the billing store.
#[async_trait]
pub trait BillingUnitOfWork: Send {
    /// Records `event_id` as processed.
    ///
    /// Returns `SaveResult::AlreadyExists` if the id was committed before.
    async fn mark_event_processed(
        &mut self,
        event_id: &str,
        event_type: &str,
    ) -> Result<SaveResult, DomainError>;

    /// Stores the outcome label of an event marked in this unit of work.
    async fn record_event_outcome(
        &mut self,
        event_id: &str,
        outcome: &str,
    ) -> Result<(), DomainError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DomainError>;

    async fn find_user_by_customer_id(
        &mut self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError>;

    /// Links a Stripe customer id to a user.
    async fn attach_customer_id(
        &mut self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError>;

    /// Loads a subscription for update by its processor id.
    async fn find_subscription(
        &mut self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn list_user_subscriptions(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Inserts or overwrites a subscription keyed by its processor id.
    async fn upsert_subscription(&mut self, subscription: &Subscription)
        -> Result<(), DomainError>;

    async fn update_user_access_flag(
        &mut self,
        user_id: &UserId,
        has_access: bool,
    ) -> Result<(), DomainError>;

    async fn set_payment_alert(&mut self, user_id: &UserId, alert: bool)
        -> Result<(), DomainError>;

    /// Makes every write of this unit of work durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
