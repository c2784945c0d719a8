//! In-memory credential store.
//!
//! [`InMemoryCredentialStore`] keeps entries in a [`DashMap`]. Nothing
//! survives a restart, which makes it the store of choice for tests and for
//! ephemeral sessions.
//!
//! Single-key operations share a gate that batch removals take exclusively,
//! so no reader ever sees a partially cleared session.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::{CredentialStore, StorageError};

/// Thread-safe in-memory [`CredentialStore`].
///
/// # Examples
///
/// ```
/// use taskdeck::store::{CredentialStore, InMemoryCredentialStore, TOKEN_KEY};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryCredentialStore::new();
/// store.set(TOKEN_KEY, "tok1").await.unwrap();
/// assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("tok1"));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    data: DashMap<String, String>,
    batch: RwLock<()>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy of every entry, taken in one step with respect to
    /// [`remove_all`](CredentialStore::remove_all).
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let _gate = self.batch.write();
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _gate = self.batch.read();
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _gate = self.batch.read();
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _gate = self.batch.write();
        for (key, value) in entries {
            self.data.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _gate = self.batch.write();
        for key in keys {
            self.data.remove(*key);
        }
        Ok(())
    }
}
