//! Stripe webhook event types.
//!
//! The envelope is parsed first, then `data.object` is decoded into the
//! typed payload matching the event type. Only fields the reconciler reads
//! are captured; everything else in Stripe's schema is ignored.

use serde::Deserialize;

use super::subscription::{ProcessorSnapshot, SubscriptionStatus};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::Timestamp;

/// Event types the reconciler acts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StripeEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Customer subscription was updated.
    CustomerSubscriptionUpdated,
    /// Customer subscription was deleted.
    CustomerSubscriptionDeleted,
    /// Invoice payment succeeded.
    InvoicePaymentSucceeded,
    /// Invoice payment failed.
    InvoicePaymentFailed,
    /// Any other event type, kept verbatim.
    Unknown(String),
}

impl StripeEventType {
    /// Parse event type from its wire name.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The Stripe event type string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown(raw) => raw,
        }
    }
}

/// A verified, typed webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,
    pub event_type: StripeEventType,
    /// Time at which the event was created.
    pub created: Timestamp,
    /// Whether this is a live mode event (vs test mode).
    pub livemode: bool,
    pub api_version: Option<String>,
    pub payload: EventPayload,
}

/// The `data.object` of an event, decoded per event type.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    CheckoutSession(CheckoutSessionObject),
    Subscription(SubscriptionObject),
    Invoice(InvoiceObject),
    /// Object of an event type the reconciler does not handle.
    Other(serde_json::Value),
}

/// Checkout session fields used by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSessionObject {
    /// Email the buyer checked out with. Stripe fills `customer_details`
    /// from the hosted form; `customer_email` is what we pre-filled.
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    /// Status a subscription created from this session starts in.
    pub fn initial_status(&self) -> SubscriptionStatus {
        match self.payment_status.as_deref() {
            Some("paid") | Some("no_payment_required") => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Incomplete,
        }
    }
}

/// Subscription fields used by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl SubscriptionObject {
    pub fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            status: self.status,
            current_period_start: self.current_period_start.and_then(Timestamp::from_unix_secs),
            current_period_end: self.current_period_end.and_then(Timestamp::from_unix_secs),
            cancel_at_period_end: self.cancel_at_period_end,
        }
    }
}

/// Invoice fields used by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: RawEventData,
    #[serde(default)]
    livemode: bool,
    #[serde(default)]
    api_version: Option<String>,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

impl StripeEvent {
    /// Parses a raw webhook body into a typed event.
    ///
    /// # Errors
    ///
    /// `WebhookError::ParseError` if the envelope is not valid JSON or the
    /// object does not match the shape its event type requires.
    pub fn from_slice(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parses an already decoded JSON value into a typed event.
    pub fn from_value(value: serde_json::Value) -> Result<Self, WebhookError> {
        let raw: RawEvent =
            serde_json::from_value(value).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> Result<Self, WebhookError> {
        let created = Timestamp::from_unix_secs(raw.created).ok_or_else(|| {
            WebhookError::ParseError(format!("created out of range: {}", raw.created))
        })?;
        let event_type = StripeEventType::parse(&raw.event_type);
        let object = raw.data.object;

        let payload = match event_type {
            StripeEventType::CheckoutSessionCompleted => {
                EventPayload::CheckoutSession(decode_object(object, "checkout session")?)
            }
            StripeEventType::CustomerSubscriptionUpdated
            | StripeEventType::CustomerSubscriptionDeleted => {
                EventPayload::Subscription(decode_object(object, "subscription")?)
            }
            StripeEventType::InvoicePaymentSucceeded | StripeEventType::InvoicePaymentFailed => {
                EventPayload::Invoice(decode_object(object, "invoice")?)
            }
            StripeEventType::Unknown(_) => EventPayload::Other(object),
        };

        Ok(StripeEvent {
            id: raw.id,
            event_type,
            created,
            livemode: raw.livemode,
            api_version: raw.api_version,
            payload,
        })
    }

    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Event creation time, used to order events per subscription.
    pub fn created_at(&self) -> Timestamp {
        self.created
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(
    object: serde_json::Value,
    kind: &str,
) -> Result<T, WebhookError> {
    serde_json::from_value(object)
        .map_err(|e| WebhookError::ParseError(format!("invalid {}: {}", kind, e)))
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({ "id": "cs_test_123" }),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "object": "event",
            "type": self.event_type,
            "created": self.created,
            "data": { "object": self.object },
            "livemode": self.livemode,
            "api_version": "2023-10-16",
        })
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent::from_value(self.to_json()).expect("builder produces a valid event")
    }
}
