//! Billing domain - Stripe webhook reconciliation and checkout values.
//!
//! # Module Organization
//!
//! - `webhook_verifier` - signature and timestamp checks on raw webhook bodies
//! - `stripe_event` - typed event envelope and payloads
//! - `reconciler` - applies events to local subscription and user state
//! - `subscription` - the locally reconciled subscription record
//! - `currency` / `billing_address` - checkout input values

mod billing_address;
mod currency;
mod reconciler;
mod stripe_event;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use billing_address::BillingAddress;
pub use currency::{
    from_minor_unit, is_zero_decimal_code, to_minor_unit, Currency, RecurringInterval,
};
pub use reconciler::{Outcome, WebhookReconciler};
pub use stripe_event::{
    CheckoutSessionObject, CustomerDetails, EventPayload, InvoiceObject, StripeEvent,
    StripeEventType, SubscriptionObject,
};
pub use subscription::{PaymentRecord, ProcessorSnapshot, Subscription, SubscriptionStatus};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
#[cfg(test)]
pub use webhook_verifier::test_signature_header;
