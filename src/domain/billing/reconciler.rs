//! WebhookReconciler - applies verified Stripe events to local billing state.
//!
//! Each event runs in exactly one unit of work:
//!
//! 1. record the event id (duplicate → stop, nothing written)
//! 2. apply the transition for its type
//! 3. store the outcome label next to the event id
//! 4. commit
//!
//! Any error before the commit drops the unit of work, which rolls back the
//! event marker with everything else, so Stripe's retry re-applies it.

use std::sync::Arc;

use super::stripe_event::{
    CheckoutSessionObject, EventPayload, InvoiceObject, StripeEvent, StripeEventType,
    SubscriptionObject,
};
use super::subscription::{PaymentRecord, Subscription};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{BillingRepository, BillingUnitOfWork, SaveResult};

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State changed (or the event was fully recorded).
    Applied,
    /// The event id was processed before; nothing changed.
    Duplicate,
    /// Accepted without a state change.
    Ignored { reason: String },
    /// The event referenced a subscription this service never created.
    UnknownSubscription { subscription_id: String },
    /// Checkout for a buyer with no local account.
    UnknownCustomer,
    /// Older than the newest event already applied to the subscription.
    Stale,
}

impl Outcome {
    fn ignored(reason: impl Into<String>) -> Self {
        Outcome::Ignored {
            reason: reason.into(),
        }
    }

    /// Label stored with the processed event.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Duplicate => "duplicate",
            Outcome::Ignored { .. } => "ignored",
            Outcome::UnknownSubscription { .. } => "unknown_subscription",
            Outcome::UnknownCustomer => "unknown_customer",
            Outcome::Stale => "stale",
        }
    }
}

/// Applies webhook events through the billing repository.
pub struct WebhookReconciler {
    repository: Arc<dyn BillingRepository>,
}

impl WebhookReconciler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    /// Applies one verified event at most once.
    ///
    /// # Errors
    ///
    /// `WebhookError::Repository` when the store fails; nothing was committed.
    pub async fn apply(&self, event: &StripeEvent) -> Result<Outcome, WebhookError> {
        let mut uow = self.repository.begin().await?;

        let marked = uow
            .mark_event_processed(&event.id, event.event_type.as_str())
            .await?;
        if marked == SaveResult::AlreadyExists {
            tracing::info!(event_id = %event.id, event_type = event.event_type.as_str(), "Duplicate webhook event");
            return Ok(Outcome::Duplicate);
        }

        let outcome = self.dispatch(uow.as_mut(), event).await?;

        uow.record_event_outcome(&event.id, outcome.label()).await?;
        uow.commit().await?;

        match &outcome {
            Outcome::UnknownSubscription { subscription_id } => tracing::warn!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                subscription_id = %subscription_id,
                "Webhook references unknown subscription, dropped"
            ),
            Outcome::UnknownCustomer => tracing::warn!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                "Checkout for unknown customer, dropped"
            ),
            other => tracing::info!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                outcome = other.label(),
                "Webhook event processed"
            ),
        }

        Ok(outcome)
    }

    async fn dispatch(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        event: &StripeEvent,
    ) -> Result<Outcome, WebhookError> {
        let event_at = event.created_at();

        match (&event.event_type, &event.payload) {
            (StripeEventType::CheckoutSessionCompleted, EventPayload::CheckoutSession(session)) => {
                self.checkout_completed(uow, session, event_at).await
            }
            (StripeEventType::CustomerSubscriptionUpdated, EventPayload::Subscription(sub)) => {
                self.subscription_updated(uow, sub, event_at).await
            }
            (StripeEventType::CustomerSubscriptionDeleted, EventPayload::Subscription(sub)) => {
                self.subscription_deleted(uow, sub, event_at).await
            }
            (StripeEventType::InvoicePaymentSucceeded, EventPayload::Invoice(invoice)) => {
                self.payment_succeeded(uow, invoice, event_at).await
            }
            (StripeEventType::InvoicePaymentFailed, EventPayload::Invoice(invoice)) => {
                self.payment_failed(uow, invoice, event_at).await
            }
            (StripeEventType::Unknown(name), _) => {
                Ok(Outcome::ignored(format!("unhandled event type {}", name)))
            }
            (event_type, _) => Err(WebhookError::ParseError(format!(
                "payload does not match event type {}",
                event_type.as_str()
            ))),
        }
    }

    async fn checkout_completed(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        session: &CheckoutSessionObject,
        event_at: Timestamp,
    ) -> Result<Outcome, WebhookError> {
        if let Some(subscription_id) = session.subscription.as_deref() {
            if uow.find_subscription(subscription_id).await?.is_some() {
                return Ok(Outcome::ignored("subscription already recorded"));
            }
        }

        let user = match session.customer.as_deref() {
            Some(customer_id) => uow.find_user_by_customer_id(customer_id).await?,
            None => None,
        };
        let user = match (user, session.email()) {
            (Some(user), _) => Some(user),
            (None, Some(email)) => uow.find_user_by_email(&email.trim().to_lowercase()).await?,
            (None, None) => None,
        };
        let Some(user) = user else {
            return Ok(Outcome::UnknownCustomer);
        };

        if let Some(customer_id) = session.customer.as_deref() {
            if user.stripe_customer_id.as_deref() != Some(customer_id) {
                uow.attach_customer_id(&user.id, customer_id).await?;
            }
        }

        let Some(subscription_id) = session.subscription.as_deref() else {
            // One-time payment: linking the customer is all there is to do.
            return Ok(Outcome::Applied);
        };
        let Some(customer_id) = session.customer.as_deref() else {
            return Ok(Outcome::ignored("subscription checkout without customer"));
        };

        let subscription = Subscription::from_checkout(
            subscription_id,
            user.id,
            customer_id,
            session.initial_status(),
            event_at,
        );
        uow.upsert_subscription(&subscription).await?;
        refresh_access(uow, &user.id).await?;

        Ok(Outcome::Applied)
    }

    async fn subscription_updated(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        object: &SubscriptionObject,
        event_at: Timestamp,
    ) -> Result<Outcome, WebhookError> {
        let Some(mut subscription) = uow.find_subscription(&object.id).await? else {
            return Ok(Outcome::UnknownSubscription {
                subscription_id: object.id.clone(),
            });
        };

        if subscription.status.is_terminal() {
            return Ok(Outcome::ignored(format!(
                "subscription is {}",
                subscription.status
            )));
        }
        if subscription.is_stale(event_at) {
            return Ok(Outcome::Stale);
        }

        let previous = subscription.sync_from_processor(&object.snapshot(), event_at);
        uow.upsert_subscription(&subscription).await?;
        refresh_access(uow, &subscription.user_id).await?;

        tracing::debug!(
            subscription_id = %subscription.id,
            from = %previous,
            to = %subscription.status,
            "Subscription status synced"
        );
        Ok(Outcome::Applied)
    }

    async fn subscription_deleted(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        object: &SubscriptionObject,
        event_at: Timestamp,
    ) -> Result<Outcome, WebhookError> {
        let Some(mut subscription) = uow.find_subscription(&object.id).await? else {
            return Ok(Outcome::UnknownSubscription {
                subscription_id: object.id.clone(),
            });
        };

        subscription.cancel(event_at);
        uow.upsert_subscription(&subscription).await?;
        refresh_access(uow, &subscription.user_id).await?;

        Ok(Outcome::Applied)
    }

    async fn payment_succeeded(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        invoice: &InvoiceObject,
        event_at: Timestamp,
    ) -> Result<Outcome, WebhookError> {
        let Some(subscription_id) = invoice.subscription.as_deref() else {
            return Ok(Outcome::ignored("invoice without subscription"));
        };
        let Some(mut subscription) = uow.find_subscription(subscription_id).await? else {
            return Ok(Outcome::UnknownSubscription {
                subscription_id: subscription_id.to_string(),
            });
        };

        let stale = subscription.is_stale(event_at);
        subscription.record_payment(
            PaymentRecord {
                paid_at: event_at,
                amount: invoice.amount_paid,
                currency: invoice.currency.to_lowercase(),
            },
            event_at,
        );
        uow.upsert_subscription(&subscription).await?;
        // A newer failure keeps its alert.
        if !stale {
            uow.set_payment_alert(&subscription.user_id, false).await?;
        }

        Ok(Outcome::Applied)
    }

    async fn payment_failed(
        &self,
        uow: &mut dyn BillingUnitOfWork,
        invoice: &InvoiceObject,
        event_at: Timestamp,
    ) -> Result<Outcome, WebhookError> {
        let Some(subscription_id) = invoice.subscription.as_deref() else {
            return Ok(Outcome::ignored("invoice without subscription"));
        };
        let Some(mut subscription) = uow.find_subscription(subscription_id).await? else {
            return Ok(Outcome::UnknownSubscription {
                subscription_id: subscription_id.to_string(),
            });
        };

        if subscription.is_stale(event_at) {
            return Ok(Outcome::Stale);
        }

        subscription.mark_payment_failed(event_at);
        uow.upsert_subscription(&subscription).await?;
        uow.set_payment_alert(&subscription.user_id, true).await?;
        refresh_access(uow, &subscription.user_id).await?;

        Ok(Outcome::Applied)
    }
}

/// A user has access while any of their subscriptions grants it.
async fn refresh_access(
    uow: &mut dyn BillingUnitOfWork,
    user_id: &UserId,
) -> Result<(), WebhookError> {
    let has_access = uow
        .list_user_subscriptions(user_id)
        .await?
        .iter()
        .any(|s| s.status.grants_access());
    uow.update_user_access_flag(user_id, has_access).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::account::User;
    use crate::domain::billing::stripe_event::StripeEventBuilder;
    use crate::domain::billing::SubscriptionStatus;
    use crate::domain::foundation::DomainError;
    use crate::ports::UserRepository;
    use async_trait::async_trait;
    use serde_json::json;

    const T0: i64 = 1_704_067_200;

    async fn store_with_user() -> (InMemoryStore, User) {
        let store = InMemoryStore::new();
        let user = User::new("user@example.com", "hash");
        store.users().create(&user).await.unwrap();
        (store, user)
    }

    fn checkout_event(id: &str, created: i64) -> StripeEvent {
        StripeEventBuilder::new()
            .id(id)
            .event_type("checkout.session.completed")
            .created(created)
            .object(json!({
                "id": "cs_1",
                "customer": "cus_1",
                "customer_details": { "email": "user@example.com" },
                "subscription": "sub_1",
                "payment_status": "paid"
            }))
            .build()
    }

    fn subscription_event(id: &str, event_type: &str, status: &str, created: i64) -> StripeEvent {
        StripeEventBuilder::new()
            .id(id)
            .event_type(event_type)
            .created(created)
            .object(json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": status,
                "current_period_start": T0,
                "current_period_end": T0 + 2_592_000
            }))
            .build()
    }

    fn invoice_event(id: &str, event_type: &str, created: i64) -> StripeEvent {
        StripeEventBuilder::new()
            .id(id)
            .event_type(event_type)
            .created(created)
            .object(json!({
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "amount_paid": 1999,
                "amount_due": 1999,
                "currency": "usd"
            }))
            .build()
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_creates_active_subscription_linked_to_user() {
        let (store, user) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());

        let outcome = reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.user_id, user.id);

        let user = store.user_by_email("user@example.com").await.unwrap();
        assert!(user.has_access);
        assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(store.event_outcome("evt_1").await.as_deref(), Some("applied"));
    }

    #[tokio::test]
    async fn redelivered_checkout_is_duplicate() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        let event = checkout_event("evt_1", T0);

        reconciler.apply(&event).await.unwrap();
        let before = store.subscription("sub_1").await.unwrap();
        let outcome = reconciler.apply(&event).await.unwrap();

        assert_eq!(outcome, Outcome::Duplicate);
        assert_eq!(store.subscription("sub_1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn second_checkout_for_known_subscription_is_ignored() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());

        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        let outcome = reconciler.apply(&checkout_event("evt_1b", T0 + 5)).await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored { .. }));
    }

    #[tokio::test]
    async fn unpaid_checkout_starts_incomplete_without_access() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        let event = StripeEventBuilder::new()
            .id("evt_1")
            .created(T0)
            .object(json!({
                "id": "cs_1",
                "customer": "cus_1",
                "customer_email": "USER@example.com",
                "subscription": "sub_1",
                "payment_status": "unpaid"
            }))
            .build();

        reconciler.apply(&event).await.unwrap();

        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Incomplete);
        assert!(!store.user_by_email("user@example.com").await.unwrap().has_access);
    }

    #[tokio::test]
    async fn one_time_checkout_attaches_customer_only() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        let event = StripeEventBuilder::new()
            .id("evt_pay")
            .created(T0)
            .object(json!({
                "id": "cs_1",
                "customer": "cus_9",
                "customer_email": "user@example.com",
                "payment_status": "paid"
            }))
            .build();

        let outcome = reconciler.apply(&event).await.unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let user = store.user_by_email("user@example.com").await.unwrap();
        assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_9"));
        assert!(store.subscription("sub_1").await.is_none());
    }

    #[tokio::test]
    async fn checkout_for_unknown_email_is_dropped_and_recorded() {
        let store = InMemoryStore::new();
        let reconciler = WebhookReconciler::new(store.billing());

        let outcome = reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();

        assert_eq!(outcome, Outcome::UnknownCustomer);
        assert!(store.subscription("sub_1").await.is_none());
        assert_eq!(
            store.event_outcome("evt_1").await.as_deref(),
            Some("unknown_customer")
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Update / Delete Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn update_without_checkout_is_unknown_and_creates_nothing() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());

        let outcome = reconciler
            .apply(&subscription_event(
                "evt_u",
                "customer.subscription.updated",
                "active",
                T0,
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::UnknownSubscription {
                subscription_id: "sub_1".to_string()
            }
        );
        assert!(store.subscription("sub_1").await.is_none());
    }

    #[tokio::test]
    async fn update_overwrites_status_and_period() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();

        reconciler
            .apply(&subscription_event(
                "evt_2",
                "customer.subscription.updated",
                "unpaid",
                T0 + 10,
            ))
            .await
            .unwrap();

        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Unpaid);
        assert_eq!(sub.current_period_start, Timestamp::from_unix_secs(T0));
        assert!(!store.user_by_email("user@example.com").await.unwrap().has_access);
    }

    #[tokio::test]
    async fn older_update_is_stale() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        reconciler
            .apply(&subscription_event(
                "evt_3",
                "customer.subscription.updated",
                "past_due",
                T0 + 20,
            ))
            .await
            .unwrap();

        let outcome = reconciler
            .apply(&subscription_event(
                "evt_2",
                "customer.subscription.updated",
                "active",
                T0 + 10,
            ))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Stale);
        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(store.event_outcome("evt_2").await.as_deref(), Some("stale"));
    }

    #[tokio::test]
    async fn checkout_then_delete_cancels_and_revokes_access() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();

        let outcome = reconciler
            .apply(&subscription_event(
                "evt_d",
                "customer.subscription.deleted",
                "canceled",
                T0 + 30,
            ))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(!store.user_by_email("user@example.com").await.unwrap().has_access);
    }

    #[tokio::test]
    async fn delete_applies_even_when_older() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0 + 100)).await.unwrap();

        reconciler
            .apply(&subscription_event(
                "evt_d",
                "customer.subscription.deleted",
                "canceled",
                T0,
            ))
            .await
            .unwrap();

        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn update_does_not_revive_cancelled_subscription() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        reconciler
            .apply(&subscription_event(
                "evt_d",
                "customer.subscription.deleted",
                "canceled",
                T0 + 10,
            ))
            .await
            .unwrap();

        let outcome = reconciler
            .apply(&subscription_event(
                "evt_u",
                "customer.subscription.updated",
                "active",
                T0 + 20,
            ))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Ignored { .. }));
        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_failure_marks_past_due_and_flags_user() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        let event = invoice_event("evt_2", "invoice.payment_failed", T0 + 10);

        let first = reconciler.apply(&event).await.unwrap();
        let second = reconciler.apply(&event).await.unwrap();

        assert_eq!(first, Outcome::Applied);
        assert_eq!(second, Outcome::Duplicate);
        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        let user = store.user_by_email("user@example.com").await.unwrap();
        assert!(user.payment_alert);
        assert!(user.has_access);
    }

    #[tokio::test]
    async fn payment_success_records_payment_and_clears_alert() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        reconciler
            .apply(&invoice_event("evt_2", "invoice.payment_failed", T0 + 10))
            .await
            .unwrap();

        reconciler
            .apply(&invoice_event("evt_3", "invoice.payment_succeeded", T0 + 20))
            .await
            .unwrap();

        let sub = store.subscription("sub_1").await.unwrap();
        let payment = sub.last_payment.unwrap();
        assert_eq!(payment.amount, 1999);
        assert_eq!(payment.currency, "usd");
        assert_eq!(payment.paid_at, Timestamp::from_unix_secs(T0 + 20).unwrap());
        assert!(!store.user_by_email("user@example.com").await.unwrap().payment_alert);
    }

    #[tokio::test]
    async fn late_older_success_keeps_newer_failure_alert() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        reconciler
            .apply(&invoice_event("evt_3", "invoice.payment_failed", T0 + 20))
            .await
            .unwrap();

        reconciler
            .apply(&invoice_event("evt_2", "invoice.payment_succeeded", T0 + 10))
            .await
            .unwrap();

        let sub = store.subscription("sub_1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(
            sub.last_payment.unwrap().paid_at,
            Timestamp::from_unix_secs(T0 + 10).unwrap()
        );
        assert!(store.user_by_email("user@example.com").await.unwrap().payment_alert);
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_ignored() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        let event = StripeEventBuilder::new()
            .id("evt_inv")
            .event_type("invoice.payment_succeeded")
            .object(json!({ "id": "in_1", "customer": "cus_1", "currency": "usd" }))
            .build();

        let outcome = reconciler.apply(&event).await.unwrap();

        assert!(matches!(outcome, Outcome::Ignored { .. }));
    }

    #[tokio::test]
    async fn unknown_event_type_is_ignored() {
        let store = InMemoryStore::new();
        let reconciler = WebhookReconciler::new(store.billing());
        let event = StripeEventBuilder::new()
            .id("evt_x")
            .event_type("customer.created")
            .object(json!({ "id": "cus_1" }))
            .build();

        let outcome = reconciler.apply(&event).await.unwrap();

        assert_eq!(outcome.label(), "ignored");
        assert_eq!(store.event_outcome("evt_x").await.as_deref(), Some("ignored"));
    }

    // ══════════════════════════════════════════════════════════════
    // Concurrency Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deliveries_of_one_event_apply_once() {
        let (store, _) = store_with_user().await;
        let reconciler = Arc::new(WebhookReconciler::new(store.billing()));
        let event = Arc::new(checkout_event("evt_concurrent", T0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reconciler = reconciler.clone();
                let event = event.clone();
                tokio::spawn(async move { reconciler.apply(&event).await })
            })
            .collect();

        let mut applied = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Outcome::Applied => applied += 1,
                Outcome::Duplicate => duplicates += 1,
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(store.processed_event_count().await, 1);
        assert_eq!(
            store.subscription("sub_1").await.unwrap().status,
            SubscriptionStatus::Active
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Failure Tests
    // ══════════════════════════════════════════════════════════════

    /// Delegates to the in-memory store but fails every subscription write.
    struct FailingWrites {
        inner: Arc<dyn BillingRepository>,
    }

    struct FailingUnitOfWork {
        inner: Box<dyn BillingUnitOfWork>,
    }

    #[async_trait]
    impl BillingRepository for FailingWrites {
        async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError> {
            Ok(Box::new(FailingUnitOfWork {
                inner: self.inner.begin().await?,
            }))
        }

        async fn list_subscriptions_for_user(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<Subscription>, DomainError> {
            self.inner.list_subscriptions_for_user(user_id).await
        }
    }

    #[async_trait]
    impl BillingUnitOfWork for FailingUnitOfWork {
        async fn mark_event_processed(
            &mut self,
            event_id: &str,
            event_type: &str,
        ) -> Result<SaveResult, DomainError> {
            self.inner.mark_event_processed(event_id, event_type).await
        }

        async fn record_event_outcome(
            &mut self,
            event_id: &str,
            outcome: &str,
        ) -> Result<(), DomainError> {
            self.inner.record_event_outcome(event_id, outcome).await
        }

        async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DomainError> {
            self.inner.find_user_by_email(email).await
        }

        async fn find_user_by_customer_id(
            &mut self,
            customer_id: &str,
        ) -> Result<Option<User>, DomainError> {
            self.inner.find_user_by_customer_id(customer_id).await
        }

        async fn attach_customer_id(
            &mut self,
            user_id: &UserId,
            customer_id: &str,
        ) -> Result<(), DomainError> {
            self.inner.attach_customer_id(user_id, customer_id).await
        }

        async fn find_subscription(
            &mut self,
            subscription_id: &str,
        ) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_subscription(subscription_id).await
        }

        async fn list_user_subscriptions(
            &mut self,
            user_id: &UserId,
        ) -> Result<Vec<Subscription>, DomainError> {
            self.inner.list_user_subscriptions(user_id).await
        }

        async fn upsert_subscription(
            &mut self,
            _subscription: &Subscription,
        ) -> Result<(), DomainError> {
            Err(DomainError::database("disk full"))
        }

        async fn update_user_access_flag(
            &mut self,
            user_id: &UserId,
            has_access: bool,
        ) -> Result<(), DomainError> {
            self.inner.update_user_access_flag(user_id, has_access).await
        }

        async fn set_payment_alert(
            &mut self,
            user_id: &UserId,
            alert: bool,
        ) -> Result<(), DomainError> {
            self.inner.set_payment_alert(user_id, alert).await
        }

        async fn commit(self: Box<Self>) -> Result<(), DomainError> {
            self.inner.commit().await
        }
    }

    #[tokio::test]
    async fn failed_write_rolls_back_marker_so_retry_applies() {
        let (store, user) = store_with_user().await;
        let failing = WebhookReconciler::new(Arc::new(FailingWrites {
            inner: store.billing(),
        }));
        let event = checkout_event("evt_1", T0);

        let err = failing.apply(&event).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(store.event_outcome("evt_1").await.is_none());
        let untouched = store.user_by_email("user@example.com").await.unwrap();
        assert_eq!(untouched.stripe_customer_id, user.stripe_customer_id);

        let retry = WebhookReconciler::new(store.billing());
        assert_eq!(retry.apply(&event).await.unwrap(), Outcome::Applied);
        assert!(store.subscription("sub_1").await.is_some());
    }

    #[tokio::test]
    async fn access_stays_while_another_subscription_grants_it() {
        let (store, _) = store_with_user().await;
        let reconciler = WebhookReconciler::new(store.billing());
        reconciler.apply(&checkout_event("evt_1", T0)).await.unwrap();
        let second = StripeEventBuilder::new()
            .id("evt_2")
            .created(T0 + 1)
            .object(json!({
                "id": "cs_2",
                "customer": "cus_1",
                "subscription": "sub_2",
                "payment_status": "paid"
            }))
            .build();
        reconciler.apply(&second).await.unwrap();

        reconciler
            .apply(&subscription_event(
                "evt_d",
                "customer.subscription.deleted",
                "canceled",
                T0 + 5,
            ))
            .await
            .unwrap();

        assert!(store.user_by_email("user@example.com").await.unwrap().has_access);
    }
}
