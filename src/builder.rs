//! Wiring of the session, pipeline and repository into one [`Core`].

use std::sync::Arc;

use crate::client::{
    ApiClient, BearerAuthMiddleware, ClientConfig, HttpLoggingMiddleware, HttpMiddleware,
    HttpMiddlewareChain, HttpTransport, SessionInvalidationMiddleware,
};
use crate::error::Result;
use crate::session::{SessionContext, SessionManager};
use crate::store::{CredentialStore, FileCredentialStore};
use crate::tasks::TaskRepository;

/// The assembled client core.
///
/// The session manager and the repository share one [`ApiClient`], and so
/// one middleware chain and one [`SessionContext`].
#[derive(Debug, Clone)]
pub struct Core {
    /// The session object.
    pub context: Arc<SessionContext>,
    /// Login, signup, logout, profile refresh.
    pub session: SessionManager,
    /// Task CRUD and stats.
    pub tasks: TaskRepository,
    /// The shared API client.
    pub api: Arc<ApiClient>,
}

/// Builder for [`Core`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdeck::{ClientConfig, CoreBuilder, TaskFilter};
/// use taskdeck::store::InMemoryCredentialStore;
///
/// # async fn run() -> taskdeck::Result<()> {
/// let core = CoreBuilder::new(ClientConfig::from_env())
///     .with_store(Arc::new(InMemoryCredentialStore::new()))
///     .with_http_logging(true)
///     .build()?;
///
/// core.session.init().await;
/// if core.session.login("a@b.com", "secret1").await.is_success() {
///     let tasks = core.tasks.list(TaskFilter::All).await?;
///     println!("{} tasks", tasks.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct CoreBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn CredentialStore>>,
    transport: Option<Arc<dyn HttpTransport>>,
    middleware: Vec<Arc<dyn HttpMiddleware>>,
    http_logging: Option<HttpLoggingMiddleware>,
}

impl CoreBuilder {
    /// Start from `config`.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            store: None,
            transport: None,
            middleware: Vec::new(),
            http_logging: None,
        }
    }

    /// Use `store` instead of the default credentials file.
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `transport` instead of reqwest.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add a middleware to the chain, ordered by its priority.
    pub fn with_middleware(mut self, middleware: Arc<dyn HttpMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Log every call with the default [`HttpLoggingMiddleware`].
    pub fn with_http_logging(mut self, enabled: bool) -> Self {
        self.http_logging = enabled.then(HttpLoggingMiddleware::new);
        self
    }

    /// Log every call with a customized [`HttpLoggingMiddleware`].
    pub fn with_http_logger(mut self, logger: HttpLoggingMiddleware) -> Self {
        self.http_logging = Some(logger);
        self
    }

    /// Assemble the core. The session starts in
    /// [`SessionState::Unknown`](crate::session::SessionState::Unknown);
    /// call [`SessionManager::init`] to restore it.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::Error::Configuration) for an invalid
    /// configuration or a missing transport when the `http-client` feature
    /// is off. [`Error::Storage`](crate::Error::Storage) when no store was
    /// given and the platform has no config directory.
    pub fn build(self) -> Result<Core> {
        let store: Arc<dyn CredentialStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileCredentialStore::default_location()?),
        };
        let context = Arc::new(SessionContext::new(store.clone()));

        let mut chain = HttpMiddlewareChain::new();
        chain.add(Arc::new(SessionInvalidationMiddleware::new(context.clone())));
        chain.add(Arc::new(BearerAuthMiddleware::new(store)));
        if let Some(logger) = self.http_logging {
            chain.add(Arc::new(logger));
        }
        for middleware in self.middleware {
            chain.add(middleware);
        }

        let api = Arc::new(match self.transport {
            Some(transport) => ApiClient::new(&self.config, transport, chain)?,
            None => Self::default_client(&self.config, chain)?,
        });
        tracing::debug!(base_url = %api.base_url(), middleware = api.chain().len(), "client core built");

        Ok(Core {
            session: SessionManager::new(context.clone(), api.clone()),
            tasks: TaskRepository::new(api.clone()),
            context,
            api,
        })
    }

    #[cfg(feature = "http-client")]
    fn default_client(config: &ClientConfig, chain: HttpMiddlewareChain) -> Result<ApiClient> {
        ApiClient::with_reqwest(config, chain)
    }

    #[cfg(not(feature = "http-client"))]
    fn default_client(_config: &ClientConfig, _chain: HttpMiddlewareChain) -> Result<ApiClient> {
        Err(crate::Error::Configuration(
            "no transport configured and the http-client feature is disabled".into(),
        ))
    }
}

impl std::fmt::Debug for CoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreBuilder")
            .field("config", &self.config)
            .field("custom_store", &self.store.is_some())
            .field("custom_transport", &self.transport.is_some())
            .field("middleware", &self.middleware.len())
            .field("http_logging", &self.http_logging.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCredentialStore;

    #[test]
    fn standard_chain() {
        let core = CoreBuilder::new(ClientConfig::default())
            .with_store(Arc::new(InMemoryCredentialStore::new()))
            .with_http_logging(true)
            .build()
            .unwrap();
        assert_eq!(core.api.chain().len(), 3);
        assert_eq!(core.session.state(), crate::session::SessionState::Unknown);
    }

    #[test]
    fn invalid_base_url_fails() {
        let result = CoreBuilder::new(ClientConfig::new().with_base_url("nope"))
            .with_store(Arc::new(InMemoryCredentialStore::new()))
            .build();
        assert!(result.is_err());
    }
}
