//! Credential middleware for the HTTP pipeline.
//!
//! Two independent units:
//! - [`BearerAuthMiddleware`] reads the stored token before each request and
//!   injects it into the `Authorization` header.
//! - [`SessionInvalidationMiddleware`] watches responses for `401
//!   Unauthorized` and tears the session down before the error reaches the
//!   caller.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderValue, AUTHORIZATION};

use crate::client::http_middleware::{
    HttpMiddleware, HttpMiddlewareContext, HttpRequest, HttpResponse,
};
use crate::error::{Error, Result};
use crate::session::SessionContext;
use crate::store::{CredentialStore, TOKEN_KEY};

/// Metadata key set on the call context when the server rejected the
/// credential.
pub const AUTH_FAILURE_METADATA: &str = "auth_failure";

/// A bearer credential ready to be sent.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    /// The access token
    pub token: String,
    /// Token type, `Bearer` unless the server said otherwise
    pub token_type: String,
}

impl BearerToken {
    /// Create a new bearer token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: "Bearer".to_string(),
        }
    }

    /// Get the authorization header value
    pub fn to_header_value(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Injects the stored bearer token into every outgoing request.
///
/// The token is read from the [`CredentialStore`] on each call rather than
/// cached, so a login or teardown is visible to the very next request. When
/// no token is stored, or the store cannot be read, the request goes out
/// unauthenticated.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use taskdeck::client::auth_middleware::BearerAuthMiddleware;
/// use taskdeck::client::http_middleware::HttpMiddlewareChain;
/// use taskdeck::store::InMemoryCredentialStore;
///
/// let store = Arc::new(InMemoryCredentialStore::new());
/// let mut chain = HttpMiddlewareChain::new();
/// chain.add(Arc::new(BearerAuthMiddleware::new(store)));
/// assert_eq!(chain.len(), 1);
/// ```
pub struct BearerAuthMiddleware {
    store: Arc<dyn CredentialStore>,
}

impl BearerAuthMiddleware {
    /// Create a middleware reading tokens from `store`
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    async fn current_token(&self) -> Option<BearerToken> {
        match self.store.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()).map(BearerToken::new),
            Err(err) => {
                tracing::warn!("could not read stored token, sending unauthenticated: {err}");
                None
            },
        }
    }
}

impl fmt::Debug for BearerAuthMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthMiddleware").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpMiddleware for BearerAuthMiddleware {
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        // An explicit header from the caller or a default header wins.
        if request.has_header(&AUTHORIZATION) {
            tracing::debug!(
                request_id = ?context.request_id,
                "Authorization header already present, not injecting stored token"
            );
            return Ok(());
        }

        let Some(token) = self.current_token().await else {
            tracing::trace!(request_id = ?context.request_id, "no stored token");
            return Ok(());
        };

        let mut value = HeaderValue::from_str(&token.to_header_value())
            .map_err(|_| Error::Middleware("stored token is not a valid header value".into()))?;
        value.set_sensitive(true);
        request.add_header(AUTHORIZATION, value);

        tracing::trace!(request_id = ?context.request_id, "bearer token injected");
        Ok(())
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// Tears the session down when the server answers `401 Unauthorized`.
///
/// Runs for every call, whichever component issued it. The teardown removes
/// both stored entries with one batched removal and demotes the in-memory
/// session; it completes before the response continues to the caller, who
/// then receives [`Error::Http`] with status 401.
///
/// Priority 5 places its response hook after every other middleware with a
/// larger priority value.
pub struct SessionInvalidationMiddleware {
    session: Arc<SessionContext>,
}

impl SessionInvalidationMiddleware {
    /// Create a middleware that tears down `session`
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }
}

impl fmt::Debug for SessionInvalidationMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInvalidationMiddleware")
            .field("state", &self.session.state())
            .finish()
    }
}

#[async_trait]
impl HttpMiddleware for SessionInvalidationMiddleware {
    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        if response.status != 401 {
            return Ok(());
        }

        context.set_metadata(AUTH_FAILURE_METADATA.to_string(), "true".to_string());
        tracing::warn!(
            request_id = ?context.request_id,
            "{} {} was rejected as unauthorized, ending session",
            context.method,
            context.url
        );

        // The 401 still has to reach the caller, so a failed removal is only
        // logged here. Memory is demoted either way.
        if let Err(err) = self.session.teardown().await {
            tracing::error!(request_id = ?context.request_id, "session teardown incomplete: {err}");
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        5
    }
}
