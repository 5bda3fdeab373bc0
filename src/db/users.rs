//! Data access operations on the `users` table.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use tracing::{debug, instrument, warn};

use crate::db::pool::PoolManager;
use crate::error::StoreError;
use crate::metrics;
use crate::models::{NewUser, User};

const LIST_USERS: &str = "SELECT * FROM users ORDER BY id ASC";
const GET_USER: &str = "SELECT * FROM users WHERE id = $1";
const INSERT_USER: &str =
    "INSERT INTO users (name, email, department) VALUES ($1, $2, $3) RETURNING *";
const DELETE_USER: &str = "DELETE FROM users WHERE id = $1 RETURNING id";
const PING: &str = "SELECT 1";

/// Storage for user records.
///
/// Absent rows are reported as `None`; errors are reserved for invalid input,
/// constraint violations and infrastructure failures.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// All users in ascending id order.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// The user with `id`, if any.
    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError>;

    /// Insert a user and return it with its generated id.
    async fn create_user(&self, new_user: &NewUser) -> Result<User, StoreError>;

    /// Delete the user with `id`, returning the deleted id if a row matched.
    async fn delete_user(&self, id: i32) -> Result<Option<i32>, StoreError>;

    /// Run a trivial round trip to prove storage is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed [`UserStore`].
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: Arc<PoolManager>,
}

impl PgUserStore {
    /// Create a store over the shared pool manager.
    pub fn new(pool: Arc<PoolManager>) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<PoolConnection<Postgres>, StoreError> {
        let pool = self
            .pool
            .acquire()
            .await
            .map_err(|err| checkout_failed(err.into()))?;
        pool.acquire()
            .await
            .map_err(|err| checkout_failed(err.into()))
    }
}

fn checkout_failed(err: StoreError) -> StoreError {
    metrics::inc_db_errors(err.kind());
    warn!(kind = err.kind(), "Connection checkout failed: {}", err);
    err
}

fn observe<T>(
    op: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, StoreError> {
    metrics::record_db_query_latency(start, op);
    result.map_err(|err| {
        let err = StoreError::from(err);
        metrics::inc_db_errors(err.kind());
        warn!(op, kind = err.kind(), "Query failed: {}", err);
        err
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut conn = self.connection().await?;
        let start = Instant::now();
        let result = sqlx::query_as::<_, User>(LIST_USERS)
            .fetch_all(&mut *conn)
            .await;
        let users = observe("list_users", start, result)?;
        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let mut conn = self.connection().await?;
        let start = Instant::now();
        let result = sqlx::query_as::<_, User>(GET_USER)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;
        observe("get_user", start, result)
    }

    #[instrument(skip(self, new_user), fields(email = %new_user.email()))]
    async fn create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut conn = self.connection().await?;
        let start = Instant::now();
        let result = sqlx::query_as::<_, User>(INSERT_USER)
            .bind(new_user.name())
            .bind(new_user.email())
            .bind(new_user.department())
            .fetch_one(&mut *conn)
            .await;
        let user = observe("create_user", start, result)?;
        metrics::inc_users_created();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i32) -> Result<Option<i32>, StoreError> {
        let mut conn = self.connection().await?;
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>(DELETE_USER)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;
        let deleted = observe("delete_user", start, result)?;
        if deleted.is_some() {
            metrics::inc_users_deleted();
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>(PING)
            .fetch_one(&mut *conn)
            .await;
        observe("ping", start, result).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use metrics_exporter_prometheus::PrometheusBuilder;

    use crate::config::Config;
    use crate::db::pool::PoolSettings;
    use crate::error::PoolError;

    fn unreachable_pool() -> Arc<PoolManager> {
        let config = Config::from_vars(vec![
            ("DB_HOST".to_string(), "127.0.0.1".to_string()),
            ("DB_PORT".to_string(), "1".to_string()),
        ])
        .unwrap();
        let settings = PoolSettings::from_config(&config)
            .with_max_connections(1)
            .with_acquire_timeout(Duration::from_secs(2));
        Arc::new(PoolManager::new(settings))
    }

    fn db_errors(rendered: &str, kind: &str) -> Option<u64> {
        let prefix = format!("{}{{kind=\"{}\"}} ", metrics::METRIC_DB_ERRORS, kind);
        rendered
            .lines()
            .find_map(|line| line.strip_prefix(&prefix))
            .and_then(|value| value.trim().parse().ok())
    }

    #[test]
    fn checkout_failed_keeps_error_kind() {
        let err = checkout_failed(PoolError::Closed.into());
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn pool_failures_are_counted_as_db_errors() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let store = PgUserStore::new(unreachable_pool());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(store.ping()).unwrap_err()
        });

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(db_errors(&handle.render(), "unavailable"), Some(1));
    }
}
