//! Integration tests for the users service.
//!
//! These tests require a reachable PostgreSQL with a `users` table:
//!
//! ```sql
//! CREATE TABLE users (
//!     id SERIAL PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     email TEXT NOT NULL UNIQUE,
//!     department TEXT NOT NULL DEFAULT 'General'
//! );
//! ```
//!
//! Connection settings come from the usual `DB_*` environment variables.
//! Run with: cargo test --test integration -- --ignored

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use users_service::config::Config;
use users_service::db::{PgUserStore, PoolManager, PoolSettings, PoolStatus, UserStore};
use users_service::error::{PoolError, StoreError};
use users_service::models::{NewUser, UserCreate};

/// Get a test config from environment.
fn test_config() -> Config {
    Config::load().expect("configuration should load from environment")
}

fn unique_email(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{tag}-{nanos}@integration.test")
}

fn new_user(name: &str, email: &str) -> NewUser {
    UserCreate {
        name: name.to_string(),
        email: email.to_string(),
        department: None,
    }
    .validate()
    .unwrap()
}

async fn ready_store() -> (Arc<PoolManager>, PgUserStore) {
    let pool = Arc::new(PoolManager::new(PoolSettings::from_config(&test_config())));
    pool.initialize().await.expect("database should be reachable");
    let store = PgUserStore::new(pool.clone());
    (pool, store)
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn pool_lifecycle_is_idempotent() {
    let (pool, store) = ready_store().await;
    assert_eq!(pool.status(), PoolStatus::Ready);

    pool.initialize().await.unwrap();
    assert_eq!(pool.status(), PoolStatus::Ready);
    store.ping().await.unwrap();

    pool.shutdown().await;
    pool.shutdown().await;
    assert_eq!(pool.status(), PoolStatus::Closed);

    let err = store.ping().await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn acquire_lazily_initializes() {
    let pool = Arc::new(PoolManager::new(PoolSettings::from_config(&test_config())));
    assert_eq!(pool.status(), PoolStatus::Uninitialized);

    let store = PgUserStore::new(pool.clone());
    store.ping().await.unwrap();
    assert_eq!(pool.status(), PoolStatus::Ready);

    pool.shutdown().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn concurrent_first_access_shares_one_pool() {
    let pool = Arc::new(PoolManager::new(PoolSettings::from_config(&test_config())));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(pool.status(), PoolStatus::Ready);
    assert_eq!(pool.creation_attempts(), 1);

    pool.acquire().await.unwrap();
    assert_eq!(pool.creation_attempts(), 1);

    pool.shutdown().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn shutdown_during_initialize_closes_new_pool() {
    let pool = Arc::new(PoolManager::new(PoolSettings::from_config(&test_config())));

    let init = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.initialize().await })
    };
    while pool.status() == PoolStatus::Uninitialized {
        tokio::task::yield_now().await;
    }
    pool.shutdown().await;

    assert!(matches!(init.await.unwrap(), Err(PoolError::Closed)));
    assert_eq!(pool.status(), PoolStatus::Closed);
    assert!(matches!(pool.acquire().await, Err(PoolError::Closed)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn create_get_delete_round_trip() {
    let (pool, store) = ready_store().await;
    let email = unique_email("ann");

    let created = store.create_user(&new_user("Ann", &email)).await.unwrap();
    assert_eq!(created.department, "General");
    assert_eq!(store.get_user(created.id).await.unwrap(), Some(created.clone()));

    assert_eq!(store.delete_user(created.id).await.unwrap(), Some(created.id));
    assert_eq!(store.get_user(created.id).await.unwrap(), None);
    assert_eq!(store.delete_user(created.id).await.unwrap(), None);

    pool.shutdown().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn duplicate_email_is_rejected() {
    let (pool, store) = ready_store().await;
    let email = unique_email("dup");

    let first = store.create_user(&new_user("First", &email)).await.unwrap();
    let err = store
        .create_user(&new_user("Second", &email))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::DuplicateKey(_)));
    assert_eq!(store.get_user(first.id).await.unwrap(), Some(first.clone()));

    store.delete_user(first.id).await.unwrap();
    pool.shutdown().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn list_is_ordered_by_id() {
    let (pool, store) = ready_store().await;
    let a = store
        .create_user(&new_user("A", &unique_email("list-a")))
        .await
        .unwrap();
    let b = store
        .create_user(&new_user("B", &unique_email("list-b")))
        .await
        .unwrap();

    let users = store.list_users().await.unwrap();
    assert!(users.windows(2).all(|w| w[0].id <= w[1].id));
    assert!(users.iter().any(|u| u.id == a.id));
    assert!(users.iter().any(|u| u.id == b.id));

    store.delete_user(a.id).await.unwrap();
    store.delete_user(b.id).await.unwrap();
    pool.shutdown().await;
}
