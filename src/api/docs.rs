//! OpenAPI document for the HTTP API.

use utoipa::OpenApi;

use super::error::ErrorBody;
use super::handlers::{
    self, EndpointInfo, HealthResponse, IndexResponse, MessageResponse, UnhealthyResponse,
};
use crate::models::{User, UserCreate, UserList};

/// OpenAPI description served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "Users API", version = "2.0.0"),
    paths(
        handlers::index,
        handlers::health,
        handlers::list_users,
        handlers::get_user,
        handlers::create_user,
        handlers::delete_user
    ),
    components(schemas(
        User,
        UserCreate,
        UserList,
        ErrorBody,
        MessageResponse,
        HealthResponse,
        UnhealthyResponse,
        IndexResponse,
        EndpointInfo
    )),
    tags(
        (name = "users", description = "User records"),
        (name = "health", description = "Service health and metadata")
    )
)]
pub struct ApiDoc;
