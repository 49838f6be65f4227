//! Authentication adapters.
//!
//! Implementations of the `PasswordHasher` and `SessionTokens` ports:
//!
//! - `argon2_hasher` - Argon2id password hashes
//! - `jwt_tokens` - HS256 session JWTs
//! - `mock` - fixed token map for tests

mod argon2_hasher;
mod jwt_tokens;
mod mock;

pub use argon2_hasher::Argon2PasswordHasher;
pub use jwt_tokens::JwtSessionTokens;
pub use mock::MockSessionTokens;
