//! API error type and its mapping to HTTP responses.
//!
//! Every handler returns `Result<_, ApiError>`; this is the only place that
//! decides status codes. Bodies are always `{"code": ..., "message": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::application::handlers::CheckoutError;
use crate::domain::billing::WebhookError;
use crate::domain::foundation::{AuthError, DomainError, ErrorCode};
use crate::ports::PaymentErrorCode;

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Webhook(WebhookError),
    Checkout(CheckoutError),
    Domain(DomainError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::Webhook(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
                AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "EMAIL_EXISTS"),
                AuthError::WeakPassword { .. } => (StatusCode::BAD_REQUEST, "WEAK_PASSWORD"),
                AuthError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
                AuthError::InvalidToken | AuthError::UserNotFound => {
                    (StatusCode::UNAUTHORIZED, "INVALID_TOKEN")
                }
                AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
                AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Webhook(err) => (err.status_code(), err.code()),
            ApiError::Checkout(err) => match err {
                CheckoutError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                CheckoutError::Provider(e) if e.code == PaymentErrorCode::InvalidRequest => {
                    (StatusCode::BAD_REQUEST, "PAYMENT_REQUEST_REJECTED")
                }
                CheckoutError::Provider(_) => (StatusCode::BAD_GATEWAY, "PAYMENT_PROVIDER_ERROR"),
                CheckoutError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ApiError::Domain(err) => match err.code {
                ErrorCode::ValidationFailed => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
                ErrorCode::UserNotFound | ErrorCode::SubscriptionNotFound => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND")
                }
                ErrorCode::UserExists => (StatusCode::CONFLICT, "EMAIL_EXISTS"),
                ErrorCode::DatabaseError | ErrorCode::InternalError => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Auth(AuthError::Internal(_)) => "Authentication unavailable".to_string(),
            ApiError::Auth(err) => err.to_string(),
            ApiError::Webhook(WebhookError::Repository(_)) => {
                "Webhook could not be stored, retry later".to_string()
            }
            ApiError::Webhook(err) => err.to_string(),
            ApiError::Checkout(CheckoutError::Repository(_)) | ApiError::Domain(_) => {
                "Internal error".to_string()
            }
            ApiError::Checkout(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "Request failed");
        }

        let body = ErrorResponse::new(code, self.message());
        (status, Json(body)).into_response()
    }
}
