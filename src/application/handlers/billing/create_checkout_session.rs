//! CreateCheckoutSessionHandler - opens a hosted checkout for an inline price.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::account::normalize_email;
use crate::domain::billing::{to_minor_unit, BillingAddress, Currency, RecurringInterval};
use crate::domain::foundation::{AuthenticatedUser, DomainError, ValidationError};
use crate::ports::{CheckoutProvider, CheckoutSession, CreateCheckoutRequest, PaymentError, UserRepository};

const DEFAULT_PRODUCT_NAME: &str = "Default Product";

/// Command to start a checkout for the logged-in user.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub user: AuthenticatedUser,
    /// Email override; the account email is used when absent.
    pub email: Option<String>,
    pub product_name: Option<String>,
    /// Amount in major units (e.g. 12.34).
    pub amount: f64,
    pub currency: String,
    /// Recurring interval; `None` means a one-time payment.
    pub recurring: Option<String>,
    pub billing: Option<BillingAddress>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Errors from checkout creation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Unsupported currency or interval, or a non-positive amount.
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    /// The payment processor rejected or failed the request.
    #[error("Payment provider error: {0}")]
    Provider(#[from] PaymentError),

    #[error(transparent)]
    Repository(#[from] DomainError),
}

/// Handler for checkout session creation.
pub struct CreateCheckoutSessionHandler {
    users: Arc<dyn UserRepository>,
    provider: Arc<dyn CheckoutProvider>,
}

impl CreateCheckoutSessionHandler {
    pub fn new(users: Arc<dyn UserRepository>, provider: Arc<dyn CheckoutProvider>) -> Self {
        Self { users, provider }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CheckoutSession, CheckoutError> {
        // 1. Validate input before any remote call
        let currency: Currency = cmd.currency.parse()?;
        let recurring = cmd
            .recurring
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<RecurringInterval>)
            .transpose()?;
        let amount_minor = to_minor_unit(cmd.amount, currency)?;
        let email = match cmd.email.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => normalize_email(raw)?,
            None => cmd.user.email.clone(),
        };
        let billing = cmd
            .billing
            .map(|b| b.normalized())
            .filter(|b| !b.is_empty() || b.name.is_some());

        // 2. Remember the address for the next checkout
        if let Some(address) = &billing {
            self.users
                .update_billing_address(&cmd.user.id, address)
                .await?;
        }

        // 3. Find or create the processor customer; the hosted page can
        //    still collect everything from the email alone
        let customer_id = match self
            .provider
            .get_or_create_customer(&email, billing.as_ref())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(user_id = %cmd.user.id, error = %e, "Customer lookup failed, using email");
                None
            }
        };

        // 4. Create the session
        let session = self
            .provider
            .create_checkout_session(CreateCheckoutRequest {
                customer_id,
                customer_email: Some(email.clone()),
                product_name: cmd
                    .product_name
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
                amount_minor,
                currency,
                recurring,
                success_url: cmd.success_url,
                cancel_url: cmd.cancel_url,
            })
            .await?;

        tracing::info!(
            session_id = %session.id,
            user_id = %cmd.user.id,
            currency = currency.code(),
            amount_minor,
            "Created checkout session"
        );

        Ok(session)
    }
}
