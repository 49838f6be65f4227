//! Stripe checkout adapter.
//!
//! Implements the `CheckoutProvider` port for Stripe:
//! - Customer lookup by email, creation and address update
//! - Inline prices and hosted checkout sessions
//! - Line-item lookup for the success page
//!
//! Webhook verification does not live here; it is domain logic in
//! `domain::billing::webhook_verifier` and never calls out to Stripe.
//!
//! # Configuration
//!
//! Built from `PaymentConfig` (`PAYFLOW__PAYMENT__STRIPE_API_KEY`,
//! `PAYFLOW__PAYMENT__API_BASE_URL`).

mod api_types;
mod mock_checkout_provider;
mod stripe_adapter;

pub use api_types::{error_from_response, StripeCustomer, StripeLineItem, StripeList, StripePrice};
pub use mock_checkout_provider::MockCheckoutProvider;
pub use stripe_adapter::{
    checkout_session_params, customer_params, price_params, StripeCheckoutAdapter,
};
