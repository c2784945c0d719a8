//! Durable key-value persistence for session credentials.
//!
//! The [`CredentialStore`] trait is the contract every persistence engine
//! implements: [`get`](CredentialStore::get), [`set`](CredentialStore::set),
//! [`set_many`](CredentialStore::set_many) and
//! [`remove_all`](CredentialStore::remove_all). Stores are dumb string maps;
//! what the entries mean is decided by [`SessionContext`](crate::session::SessionContext).
//!
//! # Keys
//!
//! The session occupies exactly two entries: [`TOKEN_KEY`] holds the bearer
//! token and [`PROFILE_KEY`] holds the JSON-serialized
//! [`UserProfile`](crate::types::UserProfile).
//!
//! # Failure policy
//!
//! Callers treat read failures as "absent" (fail-open to logged-out) and
//! propagate write failures.

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::{FileCredentialStore, CREDENTIALS_FILE};
pub use memory::InMemoryCredentialStore;

/// Key of the bearer token entry.
pub const TOKEN_KEY: &str = "auth_token";

/// Key of the serialized user profile entry.
pub const PROFILE_KEY: &str = "user_profile";

/// Every key owned by the session, removed together on teardown.
pub const SESSION_KEYS: [&str; 2] = [TOKEN_KEY, PROFILE_KEY];

/// Errors that can occur during credential persistence.
///
/// # Examples
///
/// ```
/// use taskdeck::store::StorageError;
///
/// let err = StorageError::Backend {
///     message: "keychain locked".to_string(),
///     source: None,
/// };
/// assert_eq!(err.to_string(), "storage backend error: keychain locked");
/// ```
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the underlying file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted data could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure.
    #[error("storage backend error: {message}")]
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Key-value persistence that survives process restarts.
///
/// Implementations must be `Send + Sync`; a single store is shared by the
/// session context and the HTTP pipeline.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write fails.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Stores several entries. Backends that can write atomically should
    /// override this; the default writes each entry in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`StorageError`] encountered.
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Removes every key in `keys` as a single batched operation. Missing
    /// keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the removal fails.
    async fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}
