//! Stripe REST response types.
//!
//! Only the fields this service reads are modelled; Stripe adds fields
//! freely, and unknown ones are ignored by serde.

use serde::Deserialize;

use crate::ports::{PaymentError, PaymentErrorCode};

/// A Stripe list envelope (`{"object":"list","data":[...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Customer object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Price object, as created inline for each checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    pub currency: String,
}

/// Checkout session object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    /// Hosted page URL; absent once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
}

/// One line item of a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeLineItem {
    #[serde(default)]
    pub price: Option<StripePrice>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

impl StripeLineItem {
    /// Unit amount (minor units) and currency, preferring the price.
    pub fn amount_and_currency(&self) -> Option<(i64, String)> {
        match &self.price {
            Some(StripePrice {
                unit_amount: Some(amount),
                currency,
                ..
            }) => Some((*amount, currency.clone())),
            _ => Some((self.amount_total?, self.currency.clone()?)),
        }
    }
}

/// Error envelope returned with every non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Maps a non-success response to a `PaymentError`.
///
/// The HTTP status decides the category; the body only supplies the message.
pub fn error_from_response(status: u16, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);

    let message = detail
        .as_ref()
        .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
        .unwrap_or_else(|| format!("Stripe API returned HTTP {}", status));

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        400 | 402 | 409 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    PaymentError::new(code, message)
}
