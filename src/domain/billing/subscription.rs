//! Locally reconciled subscription state.
//!
//! A `Subscription` mirrors the processor's subscription record closely
//! enough to gate access. It is created by the first completed checkout and
//! afterwards only moves in response to webhook events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

/// Subscription status, the processor's status set as a closed enum.
///
/// The processor spells the terminal state `canceled`; it is stored and
/// displayed as `cancelled`. Both spellings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Unpaid,
    Paused,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl SubscriptionStatus {
    /// Storage and display form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a user holding a subscription in this status gets access.
    ///
    /// Past-due keeps access while the processor retries the card.
    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }

    /// Terminal statuses are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Cancelled | SubscriptionStatus::IncompleteExpired
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            "incomplete_expired" => Ok(SubscriptionStatus::IncompleteExpired),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "paused" => Ok(SubscriptionStatus::Paused),
            "cancelled" | "canceled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::unsupported("subscription_status", other)),
        }
    }
}

/// Last successful payment recorded against a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub paid_at: Timestamp,
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub currency: String,
}

/// A subscription as known to this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Processor subscription id (`sub_...`).
    pub id: String,
    pub user_id: UserId,
    /// Processor customer id (`cus_...`).
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub last_payment: Option<PaymentRecord>,
    /// Creation time of the newest event applied to this subscription.
    pub last_event_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Status fields carried by a processor subscription object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSnapshot {
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
}

impl Subscription {
    /// Creates the local record for a freshly completed checkout.
    pub fn from_checkout(
        id: impl Into<String>,
        user_id: UserId,
        customer_id: impl Into<String>,
        status: SubscriptionStatus,
        event_at: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: id.into(),
            user_id,
            customer_id: customer_id.into(),
            status,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            last_payment: None,
            last_event_at: event_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when an event created at `event_at` predates what was already applied.
    pub fn is_stale(&self, event_at: Timestamp) -> bool {
        event_at.is_before(&self.last_event_at)
    }

    /// Overwrites status and period with the processor's view (last writer wins).
    ///
    /// Returns the previous status.
    pub fn sync_from_processor(
        &mut self,
        snapshot: &ProcessorSnapshot,
        event_at: Timestamp,
    ) -> SubscriptionStatus {
        let previous = self.status;
        self.status = snapshot.status;
        self.current_period_start = snapshot.current_period_start.or(self.current_period_start);
        self.current_period_end = snapshot.current_period_end.or(self.current_period_end);
        self.cancel_at_period_end = snapshot.cancel_at_period_end;
        self.touch(event_at);
        previous
    }

    /// Moves the subscription to its terminal cancelled state.
    pub fn cancel(&mut self, event_at: Timestamp) {
        self.status = SubscriptionStatus::Cancelled;
        self.cancel_at_period_end = false;
        self.touch(event_at);
    }

    /// Marks a failed renewal. Only active or trialing subscriptions become past due.
    ///
    /// Returns true if the status changed.
    pub fn mark_payment_failed(&mut self, event_at: Timestamp) -> bool {
        let changed = matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        );
        if changed {
            self.status = SubscriptionStatus::PastDue;
        }
        self.touch(event_at);
        changed
    }

    /// Records a successful payment, keeping the most recent one.
    pub fn record_payment(&mut self, payment: PaymentRecord, event_at: Timestamp) {
        let newer = self
            .last_payment
            .as_ref()
            .map_or(true, |last| !payment.paid_at.is_before(&last.paid_at));
        if newer {
            self.last_payment = Some(payment);
        }
        self.touch(event_at);
    }

    fn touch(&mut self, event_at: Timestamp) {
        if self.last_event_at.is_before(&event_at) {
            self.last_event_at = event_at;
        }
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn active_subscription() -> Subscription {
        Subscription::from_checkout(
            "sub_1",
            UserId::new(),
            "cus_1",
            SubscriptionStatus::Active,
            ts(1_000),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Status Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn status_parses_processor_spelling_of_cancelled() {
        assert_eq!(
            "canceled".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Cancelled
        );
        assert_eq!(SubscriptionStatus::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn status_deserializes_processor_spelling() {
        let status: SubscriptionStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Cancelled);

        let status: SubscriptionStatus = serde_json::from_str("\"past_due\"").unwrap();
        assert_eq!(status, SubscriptionStatus::PastDue);
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!("expired".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn access_follows_status() {
        assert!(SubscriptionStatus::Active.grants_access());
        assert!(SubscriptionStatus::Trialing.grants_access());
        assert!(SubscriptionStatus::PastDue.grants_access());
        assert!(!SubscriptionStatus::Incomplete.grants_access());
        assert!(!SubscriptionStatus::Unpaid.grants_access());
        assert!(!SubscriptionStatus::Paused.grants_access());
        assert!(!SubscriptionStatus::Cancelled.grants_access());
    }

    // ══════════════════════════════════════════════════════════════
    // Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn sync_overwrites_status_and_advances_event_time() {
        let mut sub = active_subscription();
        let snapshot = ProcessorSnapshot {
            status: SubscriptionStatus::PastDue,
            current_period_start: Some(ts(1_000)),
            current_period_end: Some(ts(2_000)),
            cancel_at_period_end: true,
        };

        let previous = sub.sync_from_processor(&snapshot, ts(1_500));

        assert_eq!(previous, SubscriptionStatus::Active);
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.current_period_end, Some(ts(2_000)));
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.last_event_at, ts(1_500));
    }

    #[test]
    fn is_stale_compares_against_last_applied_event() {
        let sub = active_subscription();
        assert!(sub.is_stale(ts(999)));
        assert!(!sub.is_stale(ts(1_000)));
        assert!(!sub.is_stale(ts(1_001)));
    }

    #[test]
    fn payment_failure_moves_active_to_past_due() {
        let mut sub = active_subscription();
        assert!(sub.mark_payment_failed(ts(1_100)));
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
    }

    #[test]
    fn payment_failure_leaves_other_statuses_alone() {
        let mut sub = active_subscription();
        sub.status = SubscriptionStatus::Unpaid;

        assert!(!sub.mark_payment_failed(ts(1_100)));
        assert_eq!(sub.status, SubscriptionStatus::Unpaid);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut sub = active_subscription();
        sub.cancel(ts(1_100));
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.status.is_terminal());
    }

    #[test]
    fn record_payment_keeps_latest_payment() {
        let mut sub = active_subscription();
        sub.record_payment(
            PaymentRecord {
                paid_at: ts(2_000),
                amount: 1999,
                currency: "usd".to_string(),
            },
            ts(2_000),
        );
        sub.record_payment(
            PaymentRecord {
                paid_at: ts(1_500),
                amount: 999,
                currency: "usd".to_string(),
            },
            ts(1_500),
        );

        let last = sub.last_payment.unwrap();
        assert_eq!(last.amount, 1999);
        assert_eq!(sub.last_event_at, ts(2_000));
    }
}
