//! HTTP DTOs for checkout, webhook and subscription endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingAddress, PaymentRecord, Subscription};
use crate::ports::{CheckoutSession, CheckoutSummary};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Amount in major units, accepted as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// Unparseable text becomes NaN, which checkout validation rejects.
    pub fn value(&self) -> f64 {
        match self {
            AmountInput::Number(n) => *n,
            AmountInput::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

impl Default for AmountInput {
    fn default() -> Self {
        AmountInput::Number(0.0)
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

/// Billing address as posted by the checkout form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAddressRequest {
    pub name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(alias = "postal_code")]
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl From<BillingAddressRequest> for BillingAddress {
    fn from(req: BillingAddressRequest) -> Self {
        BillingAddress {
            name: req.name,
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
        }
    }
}

/// Request to open a hosted checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionRequest {
    /// Email override for the processor customer.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub amount: AmountInput,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// `day`, `week`, `month` or `year`; absent for a one-time payment.
    #[serde(default)]
    pub recurring: Option<String>,
    #[serde(default)]
    pub billing: Option<BillingAddressRequest>,
}

/// Query string of the success redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response with the hosted checkout URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub url: String,
    pub session_id: String,
}

impl From<CheckoutSession> for CheckoutSessionResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            url: session.url,
            session_id: session.id,
        }
    }
}

/// Success page data; both fields are null when the session is unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSummaryResponse {
    pub session_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

impl CheckoutSummaryResponse {
    pub fn new(session_id: Option<String>, summary: CheckoutSummary) -> Self {
        Self {
            session_id,
            amount: summary.amount,
            currency: summary.currency,
        }
    }
}

/// Acknowledgement returned to the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub paid_at: String,
    pub amount: i64,
    pub currency: String,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(payment: PaymentRecord) -> Self {
        Self {
            paid_at: payment.paid_at.as_datetime().to_rfc3339(),
            amount: payment.amount,
            currency: payment.currency,
        }
    }
}

/// One locally reconciled subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub status: String,
    pub current_period_start: Option<String>,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
    pub last_payment: Option<PaymentResponse>,
    pub updated_at: String,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            status: sub.status.as_str().to_string(),
            current_period_start: sub.current_period_start.map(|t| t.as_datetime().to_rfc3339()),
            current_period_end: sub.current_period_end.map(|t| t.as_datetime().to_rfc3339()),
            cancel_at_period_end: sub.cancel_at_period_end,
            last_payment: sub.last_payment.map(PaymentResponse::from),
            updated_at: sub.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionListResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
}
