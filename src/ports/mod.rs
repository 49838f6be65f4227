//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `BillingRepository` / `BillingUnitOfWork` - transactional store used by
//!   webhook reconciliation
//! - `UserRepository` - user accounts
//!
//! ## External Service Ports
//!
//! - `CheckoutProvider` - hosted checkout sessions at the payment processor
//!
//! ## Authentication Ports
//!
//! - `SessionTokens` - issue and validate session tokens
//! - `PasswordHasher` - one-way password hashing

mod billing_repository;
mod checkout_provider;
mod session_tokens;
mod user_repository;

pub use billing_repository::{BillingRepository, BillingUnitOfWork, SaveResult};
pub use checkout_provider::{
    CheckoutMode, CheckoutProvider, CheckoutSession, CheckoutSummary, CreateCheckoutRequest,
    PaymentError, PaymentErrorCode,
};
pub use session_tokens::{IssuedToken, PasswordHasher, SessionTokens};
pub use user_repository::UserRepository;
