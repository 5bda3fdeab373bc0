//! Database access.
//!
//! This module handles:
//! - The process-wide connection pool and its lifecycle
//! - SQL operations on the `users` table
//! - An in-memory store with the same semantics for tests

pub mod memory;
pub mod pool;
pub mod users;

pub use memory::InMemoryUserStore;
pub use pool::{PoolManager, PoolSettings, PoolStatus};
pub use users::{PgUserStore, UserStore};
