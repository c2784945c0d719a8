//! HTTP middleware for request/response transformation.
//!
//! Every call made by [`ApiClient`](crate::client::ApiClient) passes through
//! an [`HttpMiddlewareChain`]: request hooks run in ascending
//! [`priority`](HttpMiddleware::priority) order before dispatch, response and
//! error hooks run in the reverse order afterwards. Credential attachment,
//! session invalidation and logging are all middleware.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use url::Url;

use crate::error::{Error, Result};

/// Context for HTTP middleware execution.
#[derive(Debug, Clone)]
pub struct HttpMiddlewareContext {
    /// Request ID for correlation
    pub request_id: Option<String>,
    /// URL being requested
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Attempt number. Always 0: the pipeline never retries.
    pub attempt: u32,
    /// Custom metadata shared between middleware for this call
    pub metadata: Arc<parking_lot::RwLock<HashMap<String, String>>>,
}

impl HttpMiddlewareContext {
    /// Create a new HTTP middleware context with a fresh request id
    pub fn new(url: String, method: String) -> Self {
        Self {
            request_id: Some(uuid::Uuid::new_v4().to_string()),
            url,
            method,
            attempt: 0,
            metadata: Arc::new(parking_lot::RwLock::new(HashMap::new())),
        }
    }

    /// Set metadata value
    pub fn set_metadata(&self, key: String, value: String) {
        self.metadata.write().insert(key, value);
    }

    /// Get metadata value
    pub fn get_metadata(&self, key: &str) -> Option<String> {
        self.metadata.read().get(key).cloned()
    }
}

/// Outgoing HTTP request as seen by middleware.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute request URL, query included
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, empty for bodiless requests
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a bodiless request
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Attach a JSON body and the matching content type
    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = body;
        self
    }

    /// Add a header, replacing any previous value
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Get a header value as text
    pub fn get_header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Check whether a header is present
    pub fn has_header(&self, name: &HeaderName) -> bool {
        self.headers.contains_key(name)
    }
}

/// HTTP response as seen by middleware
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Create a response with headers
    pub fn with_headers(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get a header value as text
    pub fn get_header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Body decoded lossily as UTF-8
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP-level middleware trait.
///
/// # Examples
///
/// ```rust
/// use taskdeck::client::http_middleware::{HttpMiddleware, HttpRequest, HttpMiddlewareContext};
/// use async_trait::async_trait;
/// use http::header::{HeaderName, HeaderValue};
///
/// struct DeviceHeaderMiddleware {
///     device_id: HeaderValue,
/// }
///
/// #[async_trait]
/// impl HttpMiddleware for DeviceHeaderMiddleware {
///     async fn on_request(
///         &self,
///         request: &mut HttpRequest,
///         _context: &HttpMiddlewareContext,
///     ) -> taskdeck::Result<()> {
///         request.add_header(HeaderName::from_static("x-device-id"), self.device_id.clone());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait HttpMiddleware: Send + Sync {
    /// Called before the request is dispatched
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        let _ = (request, context);
        Ok(())
    }

    /// Called after a response arrives, whatever its status
    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        let _ = (response, context);
        Ok(())
    }

    /// Called when the call fails, before the error reaches the caller
    async fn on_error(&self, error: &Error, context: &HttpMiddlewareContext) -> Result<()> {
        let _ = (error, context);
        Ok(())
    }

    /// Priority for ordering (lower runs first on requests)
    fn priority(&self) -> i32 {
        50
    }

    /// Should this middleware execute for this context?
    async fn should_execute(&self, _context: &HttpMiddlewareContext) -> bool {
        true
    }
}

/// Ordered chain of HTTP middleware
#[derive(Clone, Default)]
pub struct HttpMiddlewareChain {
    middlewares: Vec<Arc<dyn HttpMiddleware>>,
}

impl HttpMiddlewareChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware to the chain. Equal priorities keep insertion order.
    pub fn add(&mut self, middleware: Arc<dyn HttpMiddleware>) {
        self.middlewares.push(middleware);
        self.middlewares.sort_by_key(|m| m.priority());
    }

    /// Number of middleware in the chain
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Process request through all middleware
    pub async fn process_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        for middleware in &self.middlewares {
            if middleware.should_execute(context).await {
                middleware.on_request(request, context).await?;
            }
        }
        Ok(())
    }

    /// Process response through all middleware (in reverse order).
    ///
    /// Every hook runs even after one fails, so a later hook (such as
    /// session invalidation) always sees the response. The first failure is
    /// returned.
    pub async fn process_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        let mut first_err = None;
        for middleware in self.middlewares.iter().rev() {
            if middleware.should_execute(context).await {
                if let Err(err) = middleware.on_response(response, context).await {
                    tracing::warn!(request_id = ?context.request_id, "response hook failed: {err}");
                    first_err.get_or_insert(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Notify all middleware of a failed call (in reverse order).
    ///
    /// Failures inside error hooks are logged and do not replace the
    /// original error.
    pub async fn process_error(&self, error: &Error, context: &HttpMiddlewareContext) {
        for middleware in self.middlewares.iter().rev() {
            if middleware.should_execute(context).await {
                if let Err(hook_err) = middleware.on_error(error, context).await {
                    tracing::warn!(
                        request_id = ?context.request_id,
                        "error hook failed: {hook_err}"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpMiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMiddlewareChain")
            .field("count", &self.middlewares.len())
            .finish()
    }
}
