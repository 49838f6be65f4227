//! Checkout provider port for the hosted payment page.
//!
//! Covers the outbound half of the payment flow: finding the processor
//! customer, opening a checkout session and reading it back for the
//! success page. The inbound half (webhooks) never goes through this port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingAddress, Currency, RecurringInterval};

/// Port for checkout session integrations.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Returns the processor customer for `email`, creating one if none exists.
    ///
    /// An existing customer gets its address updated when `billing` is given.
    async fn get_or_create_customer(
        &self,
        email: &str,
        billing: Option<&BillingAddress>,
    ) -> Result<String, PaymentError>;

    /// Creates a hosted checkout session with an inline price.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Amount and currency of the first line item of a session.
    async fn get_checkout_summary(&self, session_id: &str)
        -> Result<CheckoutSummary, PaymentError>;
}

/// Whether a session charges once or starts a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Request to create a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCheckoutRequest {
    /// Existing processor customer; takes precedence over `customer_email`.
    pub customer_id: Option<String>,

    /// Email to pre-fill when no customer is known.
    pub customer_email: Option<String>,

    pub product_name: String,

    /// Unit amount in the currency's minor unit.
    pub amount_minor: i64,

    pub currency: Currency,

    /// Set for subscriptions, `None` for one-time payments.
    pub recurring: Option<RecurringInterval>,

    pub success_url: String,

    pub cancel_url: String,
}

impl CreateCheckoutRequest {
    pub fn mode(&self) -> CheckoutMode {
        if self.recurring.is_some() {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        }
    }
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID.
    pub id: String,

    /// URL for customer to complete checkout.
    pub url: String,
}

/// What the success page shows about a completed session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    /// Amount in major units.
    pub amount: Option<f64>,

    /// Upper-case ISO currency code.
    pub currency: Option<String>,
}

/// Errors from checkout provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a provider error from a non-success API response.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Could not reach the provider.
    NetworkError,
    /// API key rejected.
    AuthenticationError,
    /// The provider rejected the request parameters.
    InvalidRequest,
    /// Referenced object does not exist.
    NotFound,
    /// Any other provider failure.
    ProviderError,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentErrorCode::NetworkError | PaymentErrorCode::ProviderError)
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
