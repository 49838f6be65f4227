//! Account domain - registered users and their credentials.

mod user;

pub use user::{normalize_email, User};
