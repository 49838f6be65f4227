//! HTTP adapter for checkout and webhook endpoints.
//!
//! - `POST /webhook` - Stripe event deliveries
//! - `POST /create-checkout-session` - Open a hosted checkout
//! - `GET /success` - Completed checkout summary
//! - `GET /cancel` - Abandoned checkout page
//! - `GET /api/subscriptions` - Subscriptions of the current user

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::billing_routes;
