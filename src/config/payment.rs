//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::DEFAULT_TOLERANCE_SECS;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (`sk_...`)
    pub stripe_api_key: SecretString,

    /// Stripe publishable key (`pk_...`), handed to browser clients
    #[serde(default)]
    pub stripe_publishable_key: Option<String>,

    /// Stripe webhook signing secret (`whsec_...`)
    pub stripe_webhook_secret: SecretString,

    /// Maximum age of a webhook signature timestamp
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Reject test-mode events
    #[serde(default)]
    pub require_livemode: bool,

    /// Stripe REST base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }

        // Verify key prefixes for safety
        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if let Some(key) = &self.stripe_publishable_key {
            if !key.starts_with("pk_") {
                return Err(ValidationError::InvalidStripePublishableKey);
            }
        }
        if !(1..=3600).contains(&self.webhook_tolerance_secs) {
            return Err(ValidationError::InvalidWebhookTolerance);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: SecretString::new(String::new()),
            stripe_publishable_key: None,
            stripe_webhook_secret: SecretString::new(String::new()),
            webhook_tolerance_secs: default_webhook_tolerance(),
            require_livemode: false,
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_webhook_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

fn default_api_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}
