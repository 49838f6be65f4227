//! HTTP adapters - REST API implementations.
//!
//! Each area has its own route module; `router` assembles them with the
//! shared middleware stack.

pub mod account;
pub mod billing;
pub mod error;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use router::app_router;
pub use state::{AppState, HttpSettings};
