//! JSON API client: middleware chain + transport + status mapping.

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::client::config::ClientConfig;
use crate::client::http_middleware::{
    HttpMiddlewareChain, HttpMiddlewareContext, HttpRequest, HttpResponse,
};
use crate::client::transport::HttpTransport;
use crate::error::{Error, Result};

/// Sends calls through the middleware chain and maps the outcome.
///
/// For every call:
/// 1. default headers are applied, then request middleware runs;
/// 2. the transport dispatches the request; a transport failure runs the
///    error hooks and is returned as [`Error::Network`];
/// 3. response middleware runs for every response, whatever its status,
///    and a failing hook does not stop the hooks after it;
/// 4. a non-2xx status runs the error hooks and is returned as
///    [`Error::Http`], even when a response hook failed; on a 2xx status a
///    hook failure is returned instead, otherwise the body is decoded.
///
/// Session invalidation on `401` therefore completes before the caller sees
/// the error.
pub struct ApiClient {
    base_url: Url,
    default_headers: HeaderMap,
    chain: Arc<HttpMiddlewareChain>,
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    /// Create a client for `config` over `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid base URL, a zero
    /// timeout or an invalid header.
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
        chain: HttpMiddlewareChain,
    ) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url()?;
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Configuration(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Configuration(format!("invalid value for {name}: {e}")))?;
            default_headers.insert(name, value);
        }
        Ok(Self {
            base_url,
            default_headers,
            chain: Arc::new(chain),
            transport,
        })
    }

    /// Create a client using the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for invalid configuration.
    #[cfg(feature = "http-client")]
    pub fn with_reqwest(config: &ClientConfig, chain: HttpMiddlewareChain) -> Result<Self> {
        config.validate()?;
        let transport = crate::client::transport::ReqwestTransport::new(config)?;
        Self::new(config, Arc::new(transport), chain)
    }

    /// The server origin.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The middleware chain every call passes through.
    pub fn chain(&self) -> &HttpMiddlewareChain {
        &self.chain
    }

    /// Builds `base_url` + `segments`, each percent-encoded as one path
    /// segment, with `query` appended. An empty `query` adds no `?`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the base URL cannot carry a path.
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Configuration(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Run `request` through the chain and transport.
    ///
    /// Returns the 2xx response; see the type docs for the error mapping.
    ///
    /// # Errors
    ///
    /// [`Error::Network`], [`Error::Http`] or any middleware error.
    pub async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        for (name, value) in &self.default_headers {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }

        let context = HttpMiddlewareContext::new(request.url.to_string(), request.method.to_string());
        if let Err(err) = self.chain.process_request(&mut request, &context).await {
            self.chain.process_error(&err, &context).await;
            return Err(err);
        }

        let mut response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                self.chain.process_error(&err, &context).await;
                return Err(err);
            },
        };

        let hooks = self.chain.process_response(&mut response, &context).await;

        // A rejected status outranks a hook failure so `401` stays visible.
        if let Err(err) = hooks {
            if response.is_success() {
                self.chain.process_error(&err, &context).await;
                return Err(err);
            }
        }

        if !response.is_success() {
            let err = Error::Http {
                status: response.status,
                body: response.body_text(),
            };
            self.chain.process_error(&err, &context).await;
            return Err(err);
        }
        Ok(response)
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.execute(request).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            tracing::debug!(status = response.status, "undecodable response body: {e}");
            Error::Decode(e.to_string())
        })
    }

    fn json_request<B: Serialize + ?Sized>(method: Method, url: Url, body: &B) -> Result<HttpRequest> {
        let body = serde_json::to_vec(body)?;
        Ok(HttpRequest::new(method, url).with_json_body(body))
    }

    /// `GET` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`Error::Decode`].
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.call(HttpRequest::new(Method::GET, url)).await
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`Error::Decode`].
    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Self::json_request(Method::POST, url, body)?).await
    }

    /// `PUT` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`Error::Decode`].
    pub async fn put_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Self::json_request(Method::PUT, url, body)?).await
    }

    /// `DELETE`; any 2xx body is ignored.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute).
    pub async fn delete(&self, url: Url) -> Result<()> {
        self.execute(HttpRequest::new(Method::DELETE, url)).await?;
        Ok(())
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
