//! Unified error types for the users service.

use strum::IntoStaticStr;
use thiserror::Error;

/// Unified error type for the users service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Data access error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// I/O error, such as failing to bind the listen address.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection pool lifecycle errors.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The database is unreachable or rejected the credentials.
    #[error("failed to connect to {dsn}: {source}")]
    Connection {
        /// Redacted connection string.
        dsn: String,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    Closed,
}

/// A record failed input validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Offending field name.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Data access errors.
///
/// "Not found" is not an error here: lookups return `Option`.
#[derive(Error, Debug, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreError {
    /// Input rejected before reaching storage.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unique constraint violation.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Pool or connection cannot be used.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Anything else the database reported.
    #[error("query failed: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Short category label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateKey(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Unknown(err.to_string()),
        }
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;
