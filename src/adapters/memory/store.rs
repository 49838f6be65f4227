//! In-memory billing and user store.
//!
//! Units of work hold the store's async mutex for their whole lifetime and
//! write into a staged copy of the state. `commit` swaps the copy in; dropping
//! the unit of work simply discards it. This mirrors a serializable
//! transaction closely enough for reconciliation tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::account::User;
use crate::domain::billing::{BillingAddress, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{BillingRepository, BillingUnitOfWork, SaveResult, UserRepository};

#[derive(Debug, Clone, Default)]
struct State {
    users: HashMap<UserId, User>,
    subscriptions: HashMap<String, Subscription>,
    /// Event id → outcome label (unset until recorded).
    processed_events: HashMap<String, Option<String>>,
}

impl State {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    fn user_mut(&mut self, id: &UserId) -> Result<&mut User, DomainError> {
        self.users.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, format!("User not found: {}", id))
        })
    }

    fn subscriptions_of(&self, user_id: &UserId) -> Vec<Subscription> {
        let mut subs: Vec<Subscription> = self
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        subs
    }
}

/// Shared in-memory store implementing `BillingRepository` and `UserRepository`.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store as a billing repository.
    pub fn billing(&self) -> Arc<dyn BillingRepository> {
        Arc::new(self.clone())
    }

    /// The store as a user repository.
    pub fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(self.clone())
    }

    // === Test Helpers ===

    /// Committed subscription by processor id.
    pub async fn subscription(&self, subscription_id: &str) -> Option<Subscription> {
        self.state
            .lock()
            .await
            .subscriptions
            .get(subscription_id)
            .cloned()
    }

    /// Committed user by normalized email.
    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        self.state.lock().await.user_by_email(email).cloned()
    }

    /// Outcome label stored for a committed event.
    pub async fn event_outcome(&self, event_id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .processed_events
            .get(event_id)
            .and_then(|outcome| outcome.clone())
    }

    /// Number of committed processed-event records.
    pub async fn processed_event_count(&self) -> usize {
        self.state.lock().await.processed_events.len()
    }
}

#[async_trait]
impl BillingRepository for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, staged }))
    }

    async fn list_subscriptions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.state.lock().await.subscriptions_of(user_id))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

#[async_trait]
impl BillingUnitOfWork for InMemoryUnitOfWork {
    async fn mark_event_processed(
        &mut self,
        event_id: &str,
        _event_type: &str,
    ) -> Result<SaveResult, DomainError> {
        if self.staged.processed_events.contains_key(event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        self.staged
            .processed_events
            .insert(event_id.to_string(), None);
        Ok(SaveResult::Inserted)
    }

    async fn record_event_outcome(
        &mut self,
        event_id: &str,
        outcome: &str,
    ) -> Result<(), DomainError> {
        let record = self
            .staged
            .processed_events
            .get_mut(event_id)
            .ok_or_else(|| DomainError::database(format!("event {} not marked", event_id)))?;
        *record = Some(outcome.to_string());
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self.staged.user_by_email(email).cloned())
    }

    async fn find_user_by_customer_id(
        &mut self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn attach_customer_id(
        &mut self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let user = self.staged.user_mut(user_id)?;
        user.stripe_customer_id = Some(customer_id.to_string());
        user.updated_at = Timestamp::now();
        Ok(())
    }

    async fn find_subscription(
        &mut self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.staged.subscriptions.get(subscription_id).cloned())
    }

    async fn list_user_subscriptions(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.staged.subscriptions_of(user_id))
    }

    async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        self.staged
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn update_user_access_flag(
        &mut self,
        user_id: &UserId,
        has_access: bool,
    ) -> Result<(), DomainError> {
        let user = self.staged.user_mut(user_id)?;
        user.has_access = has_access;
        user.updated_at = Timestamp::now();
        Ok(())
    }

    async fn set_payment_alert(&mut self, user_id: &UserId, alert: bool) -> Result<(), DomainError> {
        let user = self.staged.user_mut(user_id)?;
        user.payment_alert = alert;
        user.updated_at = Timestamp::now();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self.state.lock().await.user_by_email(email).cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DomainError> {
        Ok(self.state.lock().await.user_by_email(email).is_some())
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.user_by_email(&user.email).is_some() {
            return Err(DomainError::new(
                ErrorCode::UserExists,
                format!("User already exists: {}", user.email),
            ));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(id)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Timestamp::now();
        Ok(())
    }

    async fn update_billing_address(
        &self,
        id: &UserId,
        address: &BillingAddress,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let user = state.user_mut(id)?;
        user.billing_address = Some(address.clone());
        user.updated_at = Timestamp::now();
        Ok(())
    }
}
