//! Mock checkout provider for testing.
//!
//! Provides a configurable implementation of `CheckoutProvider` for unit and
//! integration tests. Supports:
//! - Customers remembered by email
//! - Error injection (all calls, or customer lookups only)
//! - Request capture for assertions

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::BillingAddress;
use crate::ports::{
    CheckoutProvider, CheckoutSession, CheckoutSummary, CreateCheckoutRequest, PaymentError,
};

/// Mock checkout provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockCheckoutProvider::new();
/// let session = mock.create_checkout_session(request).await?;
/// assert_eq!(mock.last_request().unwrap().amount_minor, 1234);
/// ```
#[derive(Default)]
pub struct MockCheckoutProvider {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Customer id by email.
    customers: HashMap<String, String>,

    /// Every checkout request received, oldest first.
    requests: Vec<CreateCheckoutRequest>,

    /// Summary returned by `get_checkout_summary`.
    summary: CheckoutSummary,

    summary_lookups: usize,

    /// Error returned by every call.
    error: Option<PaymentError>,

    /// Error returned by customer lookups only.
    customer_error: Option<PaymentError>,
}

impl MockCheckoutProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails with `error`.
    pub fn failing(error: PaymentError) -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().error = Some(error);
        mock
    }

    /// A provider whose customer lookups fail while sessions still work.
    pub fn failing_customers(error: PaymentError) -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().customer_error = Some(error);
        mock
    }

    /// Sets the summary returned for any session id.
    pub fn with_summary(self, summary: CheckoutSummary) -> Self {
        self.inner.lock().unwrap().summary = summary;
        self
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn last_request(&self) -> Option<CreateCheckoutRequest> {
        self.inner.lock().unwrap().requests.last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    pub fn customer_count(&self) -> usize {
        self.inner.lock().unwrap().customers.len()
    }

    pub fn summary_lookups(&self) -> usize {
        self.inner.lock().unwrap().summary_lookups
    }
}

#[async_trait]
impl CheckoutProvider for MockCheckoutProvider {
    async fn get_or_create_customer(
        &self,
        email: &str,
        _billing: Option<&BillingAddress>,
    ) -> Result<String, PaymentError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.error.clone().or_else(|| state.customer_error.clone()) {
            return Err(error);
        }

        let next_id = format!("cus_mock_{}", state.customers.len() + 1);
        Ok(state
            .customers
            .entry(email.to_string())
            .or_insert(next_id)
            .clone())
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.error.clone() {
            return Err(error);
        }

        state.requests.push(request);
        let id = format!("cs_test_mock_{}", state.requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn get_checkout_summary(
        &self,
        _session_id: &str,
    ) -> Result<CheckoutSummary, PaymentError> {
        let mut state = self.inner.lock().unwrap();
        state.summary_lookups += 1;
        if let Some(error) = state.error.clone() {
            return Err(error);
        }
        Ok(state.summary.clone())
    }
}
