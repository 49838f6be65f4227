//! Billing handlers.
//!
//! ## Commands
//! - Handling signed Stripe webhooks
//! - Creating checkout sessions
//!
//! ## Queries
//! - Success-page checkout summary
//! - Listing a user's subscriptions

mod create_checkout_session;
mod get_checkout_summary;
mod handle_stripe_webhook;
mod list_subscriptions;

// Commands
pub use create_checkout_session::{
    CheckoutError, CreateCheckoutSessionCommand, CreateCheckoutSessionHandler,
};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, HandleStripeWebhookResult,
};

// Queries
pub use get_checkout_summary::{GetCheckoutSummaryHandler, GetCheckoutSummaryQuery};
pub use list_subscriptions::{
    ListSubscriptionsHandler, ListSubscriptionsQuery, ListSubscriptionsResult,
};
