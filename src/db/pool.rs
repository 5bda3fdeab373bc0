//! Process-wide PostgreSQL connection pool with an explicit lifecycle.
//!
//! The manager is created once at startup and shared by handle. The pool
//! itself lives in a [`OnceCell`], so concurrent first accesses perform a
//! single creation attempt; a failed attempt leaves the cell empty and the
//! next call retries.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use strum::Display;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PoolError;

/// Lifecycle state of a [`PoolManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PoolStatus {
    /// No pool has been opened yet.
    Uninitialized,
    /// A creation attempt is in flight.
    Initializing,
    /// The pool is open.
    Ready,
    /// The pool has been shut down.
    Closed,
}

/// Settings used to open the pool.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    connect: PgConnectOptions,
    dsn: String,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl PoolSettings {
    /// Derive pool settings from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect: config.connect_options(),
            dsn: config.redacted_dsn(),
            max_connections: config.db_max_connections,
            acquire_timeout: config.acquire_timeout(),
        }
    }

    /// Set the maximum number of pooled connections.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set how long to wait for a connection.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Owns the single connection pool of the process.
#[derive(Debug)]
pub struct PoolManager {
    settings: PoolSettings,
    pool: OnceCell<PgPool>,
    initializing: AtomicBool,
    closed: AtomicBool,
    creation_attempts: AtomicUsize,
}

/// Clears the `initializing` flag when the creation attempt ends, including
/// when the future driving it is dropped.
struct InitializingGuard<'a>(&'a AtomicBool);

impl<'a> InitializingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PoolManager {
    /// Create an uninitialized manager.
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            pool: OnceCell::new(),
            initializing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            creation_attempts: AtomicUsize::new(0),
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> PoolStatus {
        if self.closed.load(Ordering::Acquire) {
            PoolStatus::Closed
        } else if self.pool.initialized() {
            PoolStatus::Ready
        } else if self.initializing.load(Ordering::Acquire) {
            PoolStatus::Initializing
        } else {
            PoolStatus::Uninitialized
        }
    }

    /// Number of pool creation attempts started so far.
    pub fn creation_attempts(&self) -> usize {
        self.creation_attempts.load(Ordering::Acquire)
    }

    /// Open the pool if it is not open yet. Idempotent once ready.
    pub async fn initialize(&self) -> Result<(), PoolError> {
        self.ready_pool().await.map(|_| ())
    }

    /// Return a pool handle, opening the pool first if needed.
    pub async fn acquire(&self) -> Result<PgPool, PoolError> {
        self.ready_pool().await.cloned()
    }

    /// Close every pooled connection. No-op if never opened or already closed.
    ///
    /// A shutdown that lands while creation is in flight marks the manager
    /// closed; the pool that creation produces is closed before anyone gets it.
    pub async fn shutdown(&self) {
        if self.status() == PoolStatus::Uninitialized {
            debug!("Pool shutdown requested before initialization");
            return;
        }

        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some(pool) = self.pool.get() else {
            info!("Pool shutdown requested during initialization");
            return;
        };

        info!("Closing database pool ({})", self.settings.dsn);
        pool.close().await;
        info!("Database pool closed");
    }

    async fn ready_pool(&self) -> Result<&PgPool, PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let pool = self
            .pool
            .get_or_try_init(|| async {
                let _initializing = InitializingGuard::enter(&self.initializing);
                self.open().await
            })
            .await?;

        if self.closed.load(Ordering::Acquire) {
            if !pool.is_closed() {
                info!("Closing database pool opened during shutdown");
                pool.close().await;
            }
            return Err(PoolError::Closed);
        }

        Ok(pool)
    }

    async fn open(&self) -> Result<PgPool, PoolError> {
        self.creation_attempts.fetch_add(1, Ordering::AcqRel);
        info!(
            max_connections = self.settings.max_connections,
            "Opening database pool ({})", self.settings.dsn
        );

        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect_with(self.settings.connect.clone())
            .await
            .map_err(|source| {
                warn!("Database pool creation failed: {}", source);
                PoolError::Connection {
                    dsn: self.settings.dsn.clone(),
                    source,
                }
            })?;

        info!("Database pool ready");
        Ok(pool)
    }
}
