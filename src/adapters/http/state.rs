//! Shared application state for the HTTP layer.

use std::sync::Arc;

use crate::application::handlers::{
    ChangePasswordHandler, CreateCheckoutSessionHandler, GetCheckoutSummaryHandler,
    HandleStripeWebhookHandler, ListSubscriptionsHandler, LoginUserHandler, RegisterUserHandler,
};
use crate::config::AppConfig;
use crate::domain::billing::StripeWebhookVerifier;
use crate::ports::{BillingRepository, CheckoutProvider, PasswordHasher, SessionTokens, UserRepository};

/// Settings the handlers need from configuration.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Base URL for the checkout success and cancel redirects.
    pub public_url: String,
    pub min_password_length: usize,
    /// Adds `Secure` to the session cookie.
    pub secure_cookies: bool,
}

impl HttpSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            public_url: config.server.public_url.clone(),
            min_password_length: config.auth.min_password_length,
            secure_cookies: config.is_production(),
        }
    }

    /// Absolute URL for a path under the public base URL.
    pub fn public_link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:8080".to_string(),
            min_password_length: 8,
            secure_cookies: false,
        }
    }
}

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is behind an `Arc`. Handlers
/// are created on demand from it.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub billing: Arc<dyn BillingRepository>,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub verifier: Arc<StripeWebhookVerifier>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn SessionTokens>,
    pub login: Arc<LoginUserHandler>,
    pub settings: HttpSettings,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        billing: Arc<dyn BillingRepository>,
        checkout: Arc<dyn CheckoutProvider>,
        verifier: Arc<StripeWebhookVerifier>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn SessionTokens>,
        settings: HttpSettings,
    ) -> Self {
        // Built once: it hashes a throwaway password at construction.
        let login = Arc::new(LoginUserHandler::new(
            users.clone(),
            hasher.clone(),
            tokens.clone(),
        ));
        Self {
            users,
            billing,
            checkout,
            verifier,
            hasher,
            tokens,
            login,
            settings,
        }
    }

    pub fn webhook_handler(&self) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::new(self.verifier.clone(), self.billing.clone())
    }

    pub fn create_checkout_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(self.users.clone(), self.checkout.clone())
    }

    pub fn checkout_summary_handler(&self) -> GetCheckoutSummaryHandler {
        GetCheckoutSummaryHandler::new(self.checkout.clone())
    }

    pub fn list_subscriptions_handler(&self) -> ListSubscriptionsHandler {
        ListSubscriptionsHandler::new(self.billing.clone())
    }

    pub fn register_handler(&self) -> RegisterUserHandler {
        RegisterUserHandler::new(
            self.users.clone(),
            self.hasher.clone(),
            self.settings.min_password_length,
        )
    }

    pub fn change_password_handler(&self) -> ChangePasswordHandler {
        ChangePasswordHandler::new(
            self.users.clone(),
            self.hasher.clone(),
            self.settings.min_password_length,
        )
    }
}
