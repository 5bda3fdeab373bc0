//! Users CRUD service.
//!
//! A small HTTP service exposing create, read, list and delete operations on a
//! single `users` table in PostgreSQL, plus a health check that verifies database
//! connectivity.
//!
//! ```text
//! GET    /               service metadata
//! GET    /health         SELECT 1 against the pool
//! GET    /api/users      list, ascending id
//! GET    /api/users/:id  fetch one
//! POST   /api/users      create (201, 409 on duplicate email, 422 on bad input)
//! DELETE /api/users/:id  delete
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`models`]: User record and payload validation
//! - [`db`]: Connection pool lifecycle and data access
//! - [`api`]: HTTP routes, handlers and OpenAPI document
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod utils;

pub use config::Config;
pub use error::{Result, ServiceError};
