//! HTTP API module for the users endpoints, health check and API docs.

pub mod docs;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use handlers::AppState;
pub use routes::create_router;
