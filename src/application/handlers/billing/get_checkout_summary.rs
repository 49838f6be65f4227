//! GetCheckoutSummaryHandler - query for the success page.
//!
//! The success page is informational only. Any failure to read the session
//! back from the processor degrades to an empty summary instead of an error.

use std::sync::Arc;

use crate::ports::{CheckoutProvider, CheckoutSummary};

/// Query for the amount and currency of a completed checkout.
#[derive(Debug, Clone)]
pub struct GetCheckoutSummaryQuery {
    pub session_id: String,
}

pub struct GetCheckoutSummaryHandler {
    provider: Arc<dyn CheckoutProvider>,
}

impl GetCheckoutSummaryHandler {
    pub fn new(provider: Arc<dyn CheckoutProvider>) -> Self {
        Self { provider }
    }

    pub async fn handle(&self, query: GetCheckoutSummaryQuery) -> CheckoutSummary {
        if query.session_id.trim().is_empty() {
            return CheckoutSummary::default();
        }

        match self.provider.get_checkout_summary(&query.session_id).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    session_id = %query.session_id,
                    error = %e,
                    "Could not read checkout session"
                );
                CheckoutSummary::default()
            }
        }
    }
}
