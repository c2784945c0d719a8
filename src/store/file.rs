//! File-backed credential store.
//!
//! Entries live in a single JSON object file:
//!
//! ```text
//! ~/.config/taskdeck/
//! └── credentials.json   # {"auth_token": "...", "user_profile": "{...}"}
//! ```
//!
//! Every mutation rewrites the whole file through a temporary sibling and an
//! atomic rename, so a reader never sees a half-written file and
//! [`remove_all`](CredentialStore::remove_all) clears both session entries in
//! one step. On unix the directory is created `0700` and the file `0600`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CredentialStore, StorageError};

/// File name used inside the credentials directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

type Entries = BTreeMap<String, String>;

/// [`CredentialStore`] persisted to a JSON file.
///
/// # Examples
///
/// ```no_run
/// use taskdeck::store::FileCredentialStore;
///
/// let store = FileCredentialStore::default_location()?;
/// println!("credentials at {}", store.path().display());
/// # Ok::<(), taskdeck::store::StorageError>(())
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Creates a store persisting to `path`. The file is created lazily on
    /// the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store at `<config dir>/taskdeck/credentials.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the platform has no config
    /// directory.
    pub fn default_location() -> Result<Self, StorageError> {
        let dir = dirs::config_dir().ok_or_else(|| StorageError::Backend {
            message: "could not determine config directory".to_string(),
            source: None,
        })?;
        Ok(Self::new(dir.join("taskdeck").join(CREDENTIALS_FILE)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            ensure_dir(dir).await?;
        }

        let content = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if dir.as_os_str().is_empty() || tokio::fs::try_exists(dir).await? {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await?;
    }
    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value)]).await
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut current = self.read_entries().await?;
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        self.write_entries(&current).await
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut current = self.read_entries().await?;
        let before = current.len();
        for key in keys {
            current.remove(*key);
        }
        if current.len() == before {
            return Ok(());
        }
        self.write_entries(&current).await
    }
}
