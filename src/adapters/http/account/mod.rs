//! HTTP adapter for account endpoints.
//!
//! - `POST /register` - Create an account
//! - `POST /login` - Start a session (cookie and bearer token)
//! - `POST /logout` - Clear the session cookie
//! - `POST /password` - Change password

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use routes::account_routes;
