//! HTTP API route definitions.

use axum::{http::Request, middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info_span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::docs::ApiDoc;
use super::handlers::{create_user, delete_user, get_user, health, index, list_users, AppState};
use crate::metrics::track_http_latency;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let hostname = state.hostname.clone();

    Router::new()
        .route("/", get(index))
        // Health endpoint
        .route("/health", get(health))
        // Users endpoints
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", get(get_user).delete(delete_user))
        .route_layer(middleware::from_fn(track_http_latency))
        // API docs
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(move |request: &Request<_>| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    hostname = %hostname,
                )
            }),
        )
        .with_state(state)
}
