//! The explicit session object shared by the session manager and the HTTP
//! pipeline.
//!
//! A [`SessionContext`] owns the in-memory [`Session`] and the
//! [`CredentialStore`] it mirrors. Its lifecycle is:
//!
//! ```text
//! Unknown --init()--> Restoring --+--> LoggedIn   (token and profile stored)
//!                                 +--> LoggedOut  (either absent, or read failed)
//! LoggedOut --establish()--> LoggedIn
//! LoggedIn  --teardown()---> LoggedOut          (logout or a 401 anywhere)
//! ```
//!
//! Components receive an `Arc<SessionContext>`; there is no global session.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};

use crate::store::{CredentialStore, StorageError, PROFILE_KEY, SESSION_KEYS, TOKEN_KEY};
use crate::types::UserProfile;

/// Authentication state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Initial state, before [`SessionContext::init`].
    Unknown,
    /// The persisted credentials are being read.
    Restoring,
    /// No usable credentials.
    LoggedOut,
    /// A token and a profile are held.
    LoggedIn,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Restoring => write!(f, "restoring"),
            Self::LoggedOut => write!(f, "logged_out"),
            Self::LoggedIn => write!(f, "logged_in"),
        }
    }
}

/// Snapshot of the session.
///
/// `authenticated()` is derived from the fields, so it can never disagree
/// with the presence of a token and a profile.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    auth_token: Option<String>,
    user: Option<UserProfile>,
    loading: bool,
}

impl Session {
    /// The bearer token, if any.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// The profile, if any.
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// `true` only while the initial restore is running.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// `true` when both a token and a profile are held.
    pub fn authenticated(&self) -> bool {
        self.auth_token.is_some() && self.user.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .field("loading", &self.loading)
            .field("authenticated", &self.authenticated())
            .finish()
    }
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    session: Session,
}

/// Process-lifetime session object with explicit `init` and `teardown`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use taskdeck::session::{SessionContext, SessionState};
/// use taskdeck::store::InMemoryCredentialStore;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let context = SessionContext::new(Arc::new(InMemoryCredentialStore::new()));
/// assert_eq!(context.state(), SessionState::Unknown);
/// assert_eq!(context.init().await, SessionState::LoggedOut);
/// assert!(!context.snapshot().loading());
/// # });
/// ```
pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    inner: RwLock<Inner>,
    state_tx: watch::Sender<SessionState>,
    // Held across the store write of every session mutation.
    write_lock: Mutex<()>,
}

impl SessionContext {
    /// Creates a context in [`SessionState::Unknown`] over `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unknown);
        Self {
            store,
            inner: RwLock::new(Inner {
                state: SessionState::Unknown,
                session: Session {
                    loading: true,
                    ..Session::default()
                },
            }),
            state_tx,
            write_lock: Mutex::new(()),
        }
    }

    /// The credential store this context mirrors.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.inner.read().session.clone()
    }

    /// Shorthand for `snapshot().authenticated()`.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().session.authenticated()
    }

    /// Current profile, if logged in.
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.read().session.user.clone()
    }

    /// Observes state transitions. Reading [`state`](Self::state) directly
    /// is always up to date; the receiver is for consumers that want to
    /// react to changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn transition(&self, inner: &mut Inner, state: SessionState) {
        if inner.state != state {
            tracing::debug!(from = %inner.state, to = %state, "session transition");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    /// Restores the session from the store. Reads the store only on the
    /// first call; later calls return the current state.
    ///
    /// Read failures and an unreadable profile are treated as absent.
    pub async fn init(&self) -> SessionState {
        {
            let mut inner = self.inner.write();
            if inner.state != SessionState::Unknown {
                return inner.state;
            }
            self.transition(&mut inner, SessionState::Restoring);
        }

        let token = self.read_entry(TOKEN_KEY).await;
        let user = self
            .read_entry(PROFILE_KEY)
            .await
            .and_then(|raw| match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::warn!("discarding unreadable stored profile: {err}");
                    None
                },
            });

        let mut inner = self.inner.write();
        if inner.state != SessionState::Restoring {
            // A login or teardown finished while the store was being read.
            inner.session.loading = false;
            return inner.state;
        }
        let restored = match (token, user) {
            (Some(token), Some(user)) => {
                tracing::info!(user_id = %user.id, "restored persisted session");
                inner.session.auth_token = Some(token);
                inner.session.user = Some(user);
                SessionState::LoggedIn
            },
            _ => SessionState::LoggedOut,
        };
        inner.session.loading = false;
        self.transition(&mut inner, restored);
        restored
    }

    async fn read_entry(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, "credential store read failed, treating as absent: {err}");
                None
            },
        }
    }

    /// Persists `token` and `user`, then moves to [`SessionState::LoggedIn`].
    ///
    /// The store is written before memory changes, so anyone who observes
    /// the logged-in state also finds the credentials persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store write fails; the in-memory
    /// session is then left untouched.
    pub async fn establish(&self, token: String, user: UserProfile) -> Result<(), StorageError> {
        let profile = serde_json::to_string(&user)?;
        let _guard = self.write_lock.lock().await;
        self.store
            .set_many(&[(TOKEN_KEY, token.as_str()), (PROFILE_KEY, profile.as_str())])
            .await?;

        let mut inner = self.inner.write();
        tracing::info!(user_id = %user.id, "session established");
        inner.session.auth_token = Some(token);
        inner.session.user = Some(user);
        inner.session.loading = false;
        self.transition(&mut inner, SessionState::LoggedIn);
        Ok(())
    }

    /// Replaces the stored and in-memory profile without touching the token.
    ///
    /// Does nothing when the session is no longer logged in. The check and
    /// the write happen under the same lock as [`teardown`](Self::teardown),
    /// so a refresh racing a teardown cannot resurrect a profile entry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store write fails; the previous
    /// profile then stays in memory.
    pub async fn replace_profile(&self, user: UserProfile) -> Result<(), StorageError> {
        let profile = serde_json::to_string(&user)?;
        let _guard = self.write_lock.lock().await;
        if self.state() != SessionState::LoggedIn {
            tracing::debug!("session ended before profile refresh completed");
            return Ok(());
        }
        self.store.set(PROFILE_KEY, &profile).await?;

        self.inner.write().session.user = Some(user);
        Ok(())
    }

    /// Clears the store with one batched removal and demotes the session to
    /// [`SessionState::LoggedOut`].
    ///
    /// Memory is cleared even when the store removal fails.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store removal fails.
    pub async fn teardown(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let removed = self.store.remove_all(&SESSION_KEYS).await;
        if let Err(err) = &removed {
            tracing::error!("failed to clear stored credentials: {err}");
        }

        let mut inner = self.inner.write();
        inner.session.auth_token = None;
        inner.session.user = None;
        inner.session.loading = false;
        self.transition(&mut inner, SessionState::LoggedOut);
        removed
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SessionContext")
            .field("state", &inner.state)
            .field("session", &inner.session)
            .finish()
    }
}
