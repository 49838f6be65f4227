//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth types)
//! - `account` - Registered users
//! - `billing` - Subscriptions, Stripe events and webhook reconciliation

pub mod account;
pub mod billing;
pub mod foundation;
