//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresBillingRepository` - Transactional webhook reconciliation store
//! - `PostgresUserRepository` - User accounts
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod billing_repository;
mod user_repository;

pub use billing_repository::PostgresBillingRepository;
pub use user_repository::PostgresUserRepository;
