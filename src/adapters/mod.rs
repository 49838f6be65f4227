//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Argon2 password hashing and JWT session tokens
//! - `http` - axum routes, middleware and error mapping
//! - `memory` - In-memory store for tests and local runs
//! - `postgres` - sqlx repositories and the billing unit of work
//! - `stripe` - Stripe REST client for checkout sessions

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use auth::{Argon2PasswordHasher, JwtSessionTokens};
pub use memory::InMemoryStore;
pub use postgres::{PostgresBillingRepository, PostgresUserRepository};
pub use stripe::StripeCheckoutAdapter;
