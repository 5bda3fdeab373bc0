//! HTTP mapping for data access and request errors.

use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::{StoreError, ValidationError};

/// Message returned to callers for infrastructure failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
/// Message returned when storage cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str = "Database unavailable";

/// JSON error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error.
    pub error: String,
    /// Offending field, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
        }
    }
}

/// Handler error, one variant per response class.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed input, 422.
    Validation(ValidationError),
    /// No matching row, 404.
    NotFound,
    /// Unique email violated, 409.
    Conflict,
    /// Request rejected for a non-validation reason, such as a non-JSON body.
    Rejected(StatusCode, String),
    /// Pool or connection unusable, 500.
    Unavailable(String),
    /// Anything else, 500.
    Internal(String),
}

impl ApiError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Rejected(status, _) => *status,
            ApiError::Unavailable(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(v) => ApiError::Validation(v),
            StoreError::DuplicateKey(_) => ApiError::Conflict,
            StoreError::Unavailable(msg) => ApiError::Unavailable(msg),
            StoreError::Unknown(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(ValidationError::new("id", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(v) => {
                warn!(field = %v.field, "Rejected request: {}", v.message);
                ErrorBody {
                    error: v.message,
                    field: Some(v.field),
                }
            }
            ApiError::NotFound => ErrorBody::new("User not found"),
            ApiError::Conflict => ErrorBody::new("Email already exists"),
            ApiError::Rejected(_, msg) => {
                warn!("Rejected request: {}", msg);
                ErrorBody::new(msg)
            }
            ApiError::Unavailable(msg) => {
                error!(category = "storage_unavailable", "Request failed: {}", msg);
                ErrorBody::new(UNAVAILABLE_MESSAGE)
            }
            ApiError::Internal(msg) => {
                error!(category = "query_failed", "Request failed: {}", msg);
                ErrorBody::new(INTERNAL_ERROR_MESSAGE)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_distinct_statuses() {
        let cases = [
            (
                StoreError::Validation(ValidationError::new("email", "bad")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (StoreError::DuplicateKey("email".into()), StatusCode::CONFLICT),
            (
                StoreError::Unavailable("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StoreError::Unknown("syntax error".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn not_found_is_404() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
