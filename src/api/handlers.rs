//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::error::{ApiError, ErrorBody};
use super::extract::JsonBody;
use crate::db::UserStore;
use crate::models::{User, UserCreate, UserList};

/// Version reported by the index endpoint.
pub const API_VERSION: &str = "2.0.0";

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// User storage.
    pub store: Arc<dyn UserStore>,
    /// Hostname reported in responses.
    pub hostname: String,
    /// Database host reported by `/health`.
    pub db_host: String,
}

impl AppState {
    /// Create new app state.
    pub fn new(
        store: Arc<dyn UserStore>,
        hostname: impl Into<String>,
        db_host: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hostname: hostname.into(),
            db_host: db_host.into(),
        }
    }
}

/// Healthy health-check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy".
    pub status: String,
    /// Always "connected".
    pub database: String,
    /// Serving host.
    pub hostname: String,
    /// Configured database host.
    pub db_host: String,
}

/// Unhealthy health-check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UnhealthyResponse {
    /// Always "unhealthy".
    pub status: String,
    /// Why the check failed.
    pub error: String,
    /// Serving host.
    pub hostname: String,
}

/// One documented endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndpointInfo {
    /// HTTP method.
    pub method: String,
    /// Route path.
    pub path: String,
    /// What the endpoint does.
    pub description: String,
}

/// Index response.
#[derive(Debug, Serialize, ToSchema)]
pub struct IndexResponse {
    /// Service banner.
    pub message: String,
    /// API version.
    pub version: String,
    /// Serving host.
    pub hostname: String,
    /// Documented endpoints.
    pub endpoints: Vec<EndpointInfo>,
}

/// Plain message response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

const ENDPOINTS: [(&str, &str, &str); 5] = [
    ("GET", "/health", "Health check"),
    ("GET", "/api/users", "List all users"),
    ("GET", "/api/users/{id}", "Get user by ID"),
    ("POST", "/api/users", "Create new user"),
    ("DELETE", "/api/users/{id}", "Delete user"),
];

/// Health check handler - 200 when the database answers `SELECT 1`, 500 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 500, description = "Database unreachable", body = UnhealthyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "healthy".to_string(),
            database: "connected".to_string(),
            hostname: state.hostname,
            db_host: state.db_host,
        })
        .into_response(),
        Err(e) => {
            error!(category = e.kind(), "Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: e.to_string(),
                    hostname: state.hostname,
                }),
            )
                .into_response()
        }
    }
}

/// Index handler - service metadata and endpoint list.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service metadata", body = IndexResponse))
)]
pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Application API".to_string(),
        version: API_VERSION.to_string(),
        hostname: state.hostname,
        endpoints: ENDPOINTS
            .iter()
            .map(|(method, path, description)| EndpointInfo {
                method: method.to_string(),
                path: path.to_string(),
                description: description.to_string(),
            })
            .collect(),
    })
}

/// List users in ascending id order.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = UserList),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserList>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(UserList::from(users)))
}

/// Fetch one user.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 422, description = "Id is not an integer", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(id) = id?;
    state
        .store
        .get_user(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 409, description = "Email already exists", body = ErrorBody),
        (status = 415, description = "Body is not JSON", body = ErrorBody),
        (status = 422, description = "Invalid payload", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserCreate>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let new_user = payload.validate()?;
    let user = state.store.create_user(&new_user).await?;

    info!(id = user.id, "Created user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Delete a user.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 422, description = "Id is not an integer", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    match state.store.delete_user(id).await? {
        Some(deleted) => {
            info!(id = deleted, "Deleted user");
            Ok(Json(MessageResponse {
                message: format!("User {} deleted", deleted),
            }))
        }
        None => Err(ApiError::NotFound),
    }
}
