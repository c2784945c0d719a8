//! Login, signup, logout and profile refresh on top of a [`SessionContext`].

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::session::context::{Session, SessionContext, SessionState};
use crate::types::{AuthResponse, LoginRequest, SignupRequest, UserProfile};

const DEFAULT_LOGIN_FAILURE: &str = "Login failed";
const DEFAULT_SIGNUP_FAILURE: &str = "Signup failed";

/// Result of [`SessionManager::login`] and [`SessionManager::signup`].
///
/// These calls never return an error; a failure carries a message suitable
/// for showing to the user.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session is now logged in.
    Success,
    /// The attempt failed; the session is unchanged.
    Failure {
        /// The server's rejection detail, or a generic default.
        message: String,
    },
}

impl AuthOutcome {
    /// Returns `true` for [`AuthOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { message } => Some(message),
        }
    }

    fn failure(err: &Error, default: &str) -> Self {
        Self::Failure {
            message: err.detail().unwrap_or_else(|| default.to_string()),
        }
    }
}

/// Drives the authentication state machine.
///
/// All calls go through the shared [`ApiClient`], so a `401` on any of them
/// tears the session down through the pipeline.
#[derive(Debug, Clone)]
pub struct SessionManager {
    context: Arc<SessionContext>,
    api: Arc<ApiClient>,
}

impl SessionManager {
    /// Create a manager over `context`, calling the server through `api`.
    pub fn new(context: Arc<SessionContext>, api: Arc<ApiClient>) -> Self {
        Self { context, api }
    }

    /// The underlying session object.
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Restore any persisted session. See [`SessionContext::init`].
    pub async fn init(&self) -> SessionState {
        self.context.init().await
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.context.state()
    }

    /// Copy of the current session.
    pub fn session(&self) -> Session {
        self.context.snapshot()
    }

    /// `true` when a token and a profile are held.
    pub fn is_authenticated(&self) -> bool {
        self.context.is_authenticated()
    }

    /// The current profile.
    pub fn user(&self) -> Option<UserProfile> {
        self.context.user()
    }

    /// Log in with `email` and `password`.
    ///
    /// On success the token and profile are persisted and held in memory
    /// before this returns.
    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        tracing::debug!(email, "logging in");
        let result = self
            .authenticate(&["api", "auth", "login"], &LoginRequest { email, password })
            .await;
        self.finish("login", result, DEFAULT_LOGIN_FAILURE)
    }

    /// Create an account and log into it.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AuthOutcome {
        tracing::debug!(email, "signing up");
        let result = self
            .authenticate(
                &["api", "auth", "signup"],
                &SignupRequest {
                    name,
                    email,
                    password,
                },
            )
            .await;
        self.finish("signup", result, DEFAULT_SIGNUP_FAILURE)
    }

    async fn authenticate<B>(&self, path: &[&str], body: &B) -> Result<()>
    where
        B: serde::Serialize + Sync,
    {
        let url = self.api.url(path, &[])?;
        let response: AuthResponse = self.api.post_json(url, body).await?;
        self.context
            .establish(response.access_token, response.user)
            .await?;
        Ok(())
    }

    fn finish(&self, action: &str, result: Result<()>, default: &str) -> AuthOutcome {
        match result {
            Ok(()) => AuthOutcome::Success,
            Err(err) => {
                tracing::warn!("{action} failed: {err}");
                AuthOutcome::failure(&err, default)
            },
        }
    }

    /// Clear the stored credentials and the in-memory session.
    ///
    /// The session is logged out afterwards even if the store could not be
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store removal failed.
    pub async fn logout(&self) -> Result<()> {
        tracing::info!("logging out");
        self.context.teardown().await.map_err(Error::from)
    }

    /// Fetch the profile from the server and replace the held one.
    ///
    /// The token is never touched. On failure the previous profile is kept;
    /// a `401` has already logged the session out through the pipeline by
    /// the time the error is returned.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when not logged in, otherwise any pipeline or
    /// storage error.
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        if self.context.state() != SessionState::LoggedIn {
            return Err(Error::validation("not logged in"));
        }
        let url = self.api.url(&["api", "user", "profile"], &[])?;
        let profile: UserProfile = self.api.get_json(url).await.map_err(|err| {
            tracing::warn!("profile refresh failed: {err}");
            err
        })?;
        self.context.replace_profile(profile.clone()).await?;
        Ok(profile)
    }
}
