//! User account aggregate.

use serde::Serialize;

use crate::domain::billing::BillingAddress;
use crate::domain::foundation::{Timestamp, UserId, ValidationError};

/// Normalizes an email address to its stored form (trimmed, lowercase).
///
/// # Errors
///
/// `ValidationError` when the address is empty or lacks a local part and a
/// dotted domain around a single `@`.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::empty_field("email"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format("email", "not an email address"));
    }

    Ok(email)
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    /// Normalized email, unique across users.
    pub email: String,
    /// Opaque PHC-format password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Stripe customer id once a checkout linked one.
    pub stripe_customer_id: Option<String>,
    /// Whether any subscription currently grants access.
    pub has_access: bool,
    /// Set when a renewal payment failed; cleared by the next success.
    pub payment_alert: bool,
    pub billing_address: Option<BillingAddress>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Creates a new user from an already normalized email and hashed password.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: UserId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            stripe_customer_id: None,
            has_access: false,
            payment_alert: false,
            billing_address: None,
            created_at: now,
            updated_at: now,
        }
    }
}
