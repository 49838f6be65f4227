//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `auth` - Session token middleware and extractors

pub mod auth;

pub use auth::{
    auth_middleware, clear_session_cookie, extract_token, session_cookie, AuthRejection,
    AuthState, RequireAuth, SESSION_COOKIE,
};
