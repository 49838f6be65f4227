//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time values, authentication types and error types
//! used across the billing and account domains.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::UserId;
pub use timestamp::Timestamp;
