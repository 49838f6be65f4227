//! Payflow - Hosted checkout and Stripe webhook reconciliation
//!
//! Opens Stripe checkout sessions for logged-in users and keeps a local copy
//! of their subscriptions in sync by verifying and applying webhook events
//! exactly once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
