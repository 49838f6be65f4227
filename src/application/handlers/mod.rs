//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod account;
pub mod billing;

pub use account::{
    ChangePasswordCommand, ChangePasswordHandler, LoginUserCommand, LoginUserHandler,
    LoginUserResult, RegisterUserCommand, RegisterUserHandler, RegisterUserResult,
};
pub use billing::{
    CheckoutError, CreateCheckoutSessionCommand, CreateCheckoutSessionHandler,
    GetCheckoutSummaryHandler, GetCheckoutSummaryQuery, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler, HandleStripeWebhookResult, ListSubscriptionsHandler,
    ListSubscriptionsQuery, ListSubscriptionsResult,
};
