//! In-memory principal store.
//!
//! Backs the development server and the test suites. The check-then-insert
//! in [`MemoryPrincipalStore::create`] runs under a single write lock, so
//! the uniqueness guarantees hold under concurrent provisioning exactly
//! like a database unique index would.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::principal::{Principal, PrincipalStore, StoreError, StoreResult, UniqueField};

/// Thread-safe in-memory [`PrincipalStore`].
#[derive(Default)]
pub struct MemoryPrincipalStore {
    inner: RwLock<HashMap<Uuid, Principal>>,
}

impl MemoryPrincipalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored principals.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns `true` if the store holds no principals.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Principal>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Principal>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Principal>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn exists_username(&self, username: &str) -> StoreResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .any(|p| p.username == username))
    }

    async fn create(&self, principal: &Principal) -> StoreResult<()> {
        let mut inner = self.inner.write().await;

        if inner.values().any(|p| p.username == principal.username) {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        if inner.values().any(|p| p.email == principal.email) {
            return Err(StoreError::UniqueViolation(UniqueField::Email));
        }

        inner.insert(principal.id, principal.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::principal::AuthProvider;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryPrincipalStore::new();
        let alice = Principal::new("alice", "alice@x.com", AuthProvider::Local);

        store.create(&alice).await.unwrap();

        assert_eq!(
            store
                .find_by_username("alice")
                .await
                .unwrap()
                .unwrap()
                .email,
            "alice@x.com"
        );
        assert_eq!(
            store.find_by_email("alice@x.com").await.unwrap().unwrap().id,
            alice.id
        );
        assert_eq!(store.find_by_id(alice.id).await.unwrap().unwrap().id, alice.id);
        assert!(store.exists_username("alice").await.unwrap());
        assert!(!store.exists_username("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_store_unchanged() {
        let store = MemoryPrincipalStore::new();
        store
            .create(&Principal::new("alice", "alice@x.com", AuthProvider::Local))
            .await
            .unwrap();

        let duplicate = Principal::new("alice", "other@x.com", AuthProvider::Github);
        let err = store.create(&duplicate).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::UniqueViolation(UniqueField::Username)
        ));
        assert_eq!(store.len().await, 1);
        assert!(store.find_by_email("other@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_store_unchanged() {
        let store = MemoryPrincipalStore::new();
        store
            .create(&Principal::new("alice", "alice@x.com", AuthProvider::Local))
            .await
            .unwrap();

        let duplicate = Principal::new("alice2", "alice@x.com", AuthProvider::Google);
        let err = store.create(&duplicate).await.unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation(UniqueField::Email)));
        assert_eq!(store.len().await, 1);
        assert!(store.find_by_username("alice2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_create_only_one_wins() {
        use std::sync::Arc;

        let store = Arc::new(MemoryPrincipalStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let principal =
                    Principal::new("octocat", format!("octocat{i}@x.com"), AuthProvider::Github);
                store.create(&principal).await
            }));
        }

        let mut ok = 0;
        let mut collisions = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(StoreError::UniqueViolation(UniqueField::Username)) => collisions += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(collisions, 7);
        assert_eq!(store.len().await, 1);
    }
}
