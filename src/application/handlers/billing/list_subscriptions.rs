//! ListSubscriptionsHandler - the current user's reconciled subscriptions.

use std::sync::Arc;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::BillingRepository;

#[derive(Debug, Clone)]
pub struct ListSubscriptionsQuery {
    pub user_id: UserId,
}

/// Subscriptions newest first.
pub type ListSubscriptionsResult = Vec<Subscription>;

pub struct ListSubscriptionsHandler {
    repository: Arc<dyn BillingRepository>,
}

impl ListSubscriptionsHandler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: ListSubscriptionsQuery,
    ) -> Result<ListSubscriptionsResult, DomainError> {
        self.repository
            .list_subscriptions_for_user(&query.user_id)
            .await
    }
}
