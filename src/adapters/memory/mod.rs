//! In-memory adapters.
//!
//! Back the billing and user ports with a single shared map so tests and
//! local runs without Postgres see one consistent store.

mod store;

pub use store::InMemoryStore;
