//! In-memory user store for tests and local runs without PostgreSQL.
//!
//! Mirrors the database semantics the handlers rely on: ids are assigned
//! monotonically and never reused, emails are unique, and lists are ordered by
//! id. Storage outages can be simulated with [`InMemoryUserStore::set_unavailable`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::users::UserStore;
use crate::error::StoreError;
use crate::models::{NewUser, User};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i32, User>,
    last_id: i32,
}

/// In-memory [`UserStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<Table>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "connection refused (simulated)".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.check_available()?;
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        self.check_available()?;
        let mut table = self.table.write().await;

        if table.rows.values().any(|u| u.email == new_user.email()) {
            return Err(StoreError::DuplicateKey(format!(
                "duplicate key value violates unique constraint on email ({})",
                new_user.email()
            )));
        }

        table.last_id += 1;
        let user = new_user.clone().into_user(table.last_id);
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: i32) -> Result<Option<i32>, StoreError> {
        self.check_available()?;
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).map(|u| u.id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserCreate;
    use pretty_assertions::assert_eq;

    fn new_user(name: &str, email: &str) -> NewUser {
        UserCreate {
            name: name.to_string(),
            email: email.to_string(),
            department: None,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_record() {
        let store = InMemoryUserStore::new();
        let created = store.create_user(&new_user("Ann", "ann@x.com")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(store.get_user(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn duplicate_email_keeps_first_record() {
        let store = InMemoryUserStore::new();
        let first = store.create_user(&new_user("Ann", "ann@x.com")).await.unwrap();

        let err = store
            .create_user(&new_user("Other Ann", "ann@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey(_)));
        assert_eq!(store.list_users().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let store = InMemoryUserStore::new();
        let created = store.create_user(&new_user("Ann", "ann@x.com")).await.unwrap();

        assert_eq!(store.delete_user(created.id).await.unwrap(), Some(created.id));
        assert_eq!(store.get_user(created.id).await.unwrap(), None);
        assert_eq!(store.delete_user(created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ids_are_not_reused_and_list_is_ordered() {
        let store = InMemoryUserStore::new();
        store.create_user(&new_user("Ann", "ann@x.com")).await.unwrap();
        let bob = store.create_user(&new_user("Bob", "bob@x.com")).await.unwrap();
        store.delete_user(bob.id).await.unwrap();
        let cid = store.create_user(&new_user("Cid", "cid@x.com")).await.unwrap();

        assert_eq!(cid.id, 3);
        let ids: Vec<i32> = store
            .list_users()
            .await
            .unwrap()
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryUserStore::new();
        store.set_unavailable(true);

        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.list_users().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.get_user(1).await, Err(StoreError::Unavailable(_))));
    }
}
