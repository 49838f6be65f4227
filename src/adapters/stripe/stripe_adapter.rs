//! Stripe checkout adapter.
//!
//! Implements the `CheckoutProvider` port against the Stripe REST API with
//! form-encoded requests and basic auth, the way Stripe's own clients talk
//! to it. Each checkout gets an inline price so amounts can be chosen per
//! request.
//!
//! # Configuration
//!
//! ```ignore
//! let adapter = StripeCheckoutAdapter::from_config(&config.payment);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::PaymentConfig;
use crate::domain::billing::{from_minor_unit, BillingAddress};
use crate::ports::{
    CheckoutProvider, CheckoutSession, CheckoutSummary, CreateCheckoutRequest, PaymentError,
};

use super::api_types::{
    error_from_response, StripeCheckoutSession, StripeCustomer, StripeLineItem, StripeList,
    StripePrice,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com/v1";

/// Stripe implementation of `CheckoutProvider`.
pub struct StripeCheckoutAdapter {
    api_key: SecretString,
    api_base_url: String,
    http_client: reqwest::Client,
}

impl StripeCheckoutAdapter {
    /// Create an adapter talking to the public Stripe API.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.stripe_api_key.clone()).with_base_url(&config.api_base_url)
    }

    /// Set a custom API base URL, including the `/v1` prefix.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_response(path, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .query(query)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_response(path, response).await
    }

    async fn read_response<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = error_from_response(status.as_u16(), &body);
            tracing::error!(path, status = status.as_u16(), error = %err, "Stripe API call failed");
            return Err(err);
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }

    async fn find_customer(&self, email: &str) -> Result<Option<StripeCustomer>, PaymentError> {
        let list: StripeList<StripeCustomer> = self
            .get_json(
                "customers",
                &[("email", email.to_string()), ("limit", "1".to_string())],
            )
            .await?;

        Ok(list.data.into_iter().find(|c| !c.deleted))
    }
}

/// Form parameters for creating or updating a customer.
pub fn customer_params(
    email: Option<&str>,
    billing: Option<&BillingAddress>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(email) = email {
        params.push(("email", email.to_string()));
    }
    if let Some(billing) = billing {
        if let Some(name) = &billing.name {
            params.push(("name", name.clone()));
        }
        params.extend(billing.address_form_params());
    }
    params
}

/// Form parameters for the inline price of a checkout.
pub fn price_params(request: &CreateCheckoutRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("currency", request.currency.code().to_string()),
        ("unit_amount", request.amount_minor.to_string()),
        ("product_data[name]", request.product_name.clone()),
    ];
    if let Some(interval) = request.recurring {
        params.push(("recurring[interval]", interval.as_str().to_string()));
    }
    params
}

/// Form parameters for the checkout session itself.
///
/// A known customer takes precedence over the email. `submit_type` is only
/// accepted by Stripe for one-time payments.
pub fn checkout_session_params(
    request: &CreateCheckoutRequest,
    price_id: &str,
) -> Vec<(&'static str, String)> {
    let mode = request.mode();
    let mut params = vec![
        ("mode", mode.as_str().to_string()),
        ("line_items[0][price]", price_id.to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("payment_method_types[0]", "card".to_string()),
        ("billing_address_collection", "required".to_string()),
        ("locale", "auto".to_string()),
        ("allow_promotion_codes", "false".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
    ];

    match (&request.customer_id, &request.customer_email) {
        (Some(customer), _) => params.push(("customer", customer.clone())),
        (None, Some(email)) => params.push(("customer_email", email.clone())),
        (None, None) => {}
    }

    if mode == crate::ports::CheckoutMode::Payment {
        params.push(("submit_type", "pay".to_string()));
    }
    params
}

#[async_trait]
impl CheckoutProvider for StripeCheckoutAdapter {
    async fn get_or_create_customer(
        &self,
        email: &str,
        billing: Option<&BillingAddress>,
    ) -> Result<String, PaymentError> {
        if let Some(existing) = self.find_customer(email).await? {
            if billing.is_some() {
                let path = format!("customers/{}", existing.id);
                let update: Result<StripeCustomer, _> =
                    self.post_form(&path, &customer_params(None, billing)).await;
                if let Err(e) = update {
                    tracing::warn!(customer_id = %existing.id, error = %e, "Failed to update customer address");
                }
            }
            return Ok(existing.id);
        }

        let created: StripeCustomer = self
            .post_form("customers", &customer_params(Some(email), billing))
            .await?;
        tracing::info!(customer_id = %created.id, "Created Stripe customer");
        Ok(created.id)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let price: StripePrice = self.post_form("prices", &price_params(&request)).await?;

        let session: StripeCheckoutSession = self
            .post_form(
                "checkout/sessions",
                &checkout_session_params(&request, &price.id),
            )
            .await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no URL"))?;

        tracing::debug!(session_id = %session.id, price_id = %price.id, "Stripe checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn get_checkout_summary(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSummary, PaymentError> {
        let path = format!("checkout/sessions/{}/line_items", session_id);
        let items: StripeList<StripeLineItem> =
            self.get_json(&path, &[("limit", "1".to_string())]).await?;

        let summary = items
            .data
            .first()
            .and_then(StripeLineItem::amount_and_currency)
            .map(|(amount, currency)| CheckoutSummary {
                amount: Some(from_minor_unit(amount, &currency)),
                currency: Some(currency.to_uppercase()),
            })
            .unwrap_or_default();

        Ok(summary)
    }
}
