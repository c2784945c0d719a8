//! The network seam below the middleware chain.
//!
//! [`HttpTransport`] sends one fully prepared [`HttpRequest`] and returns the
//! raw [`HttpResponse`], whatever its status. Everything above it (headers,
//! credentials, status mapping, decoding) lives in
//! [`ApiClient`](crate::client::ApiClient) and its middleware, so tests can
//! substitute a scripted transport.

use async_trait::async_trait;

use crate::client::http_middleware::{HttpRequest, HttpResponse};
use crate::error::Result;

/// Sends requests over the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Dispatch `request` and return the response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) when no response was
    /// received. Non-2xx statuses are not errors at this level.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(feature = "http-client")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "http-client")]
mod reqwest_transport {
    use super::*;
    use crate::client::config::ClientConfig;
    use crate::error::Error;

    /// [`HttpTransport`] backed by a pooled `reqwest` client.
    ///
    /// The configured timeout bounds each call end to end; nothing is
    /// retried.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Build a transport with the timeout and user agent from `config`.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Configuration`] if the client cannot be built.
        pub fn new(config: &ClientConfig) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(config.timeout())
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
            Ok(Self { client })
        }

        /// Wrap an existing client.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    fn network_error(err: reqwest::Error) -> Error {
        Error::Network {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = self.client.request(method, url).headers(headers);
            if !body.is_empty() {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(network_error)?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(network_error)?;

            Ok(HttpResponse::with_headers(status, headers, body.to_vec()))
        }
    }

}
