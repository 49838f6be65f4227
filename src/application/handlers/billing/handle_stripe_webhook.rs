//! HandleStripeWebhookHandler - verifies a webhook delivery and reconciles it.

use std::sync::Arc;

use crate::domain::billing::{Outcome, StripeWebhookVerifier, WebhookError, WebhookReconciler};
use crate::ports::BillingRepository;

/// Command carrying one webhook delivery exactly as received.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    /// Raw request body. Never re-serialized before verification.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

/// Result of a processed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleStripeWebhookResult {
    pub event_id: String,
    pub event_type: String,
    pub outcome: Outcome,
}

/// Handler for Stripe webhook deliveries.
pub struct HandleStripeWebhookHandler {
    verifier: Arc<StripeWebhookVerifier>,
    reconciler: WebhookReconciler,
}

impl HandleStripeWebhookHandler {
    pub fn new(verifier: Arc<StripeWebhookVerifier>, repository: Arc<dyn BillingRepository>) -> Self {
        Self {
            verifier,
            reconciler: WebhookReconciler::new(repository),
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<HandleStripeWebhookResult, WebhookError> {
        let signature = cmd.signature.ok_or(WebhookError::MissingSignature)?;

        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &signature)
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected webhook delivery");
                e
            })?;

        let outcome = self.reconciler.apply(&event).await.map_err(|e| {
            tracing::error!(event_id = %event.id, error = %e, "Webhook reconciliation failed");
            e
        })?;

        Ok(HandleStripeWebhookResult {
            event_type: event.event_type.as_str().to_string(),
            event_id: event.id,
            outcome,
        })
    }
}
