//! HTTP client pipeline.
//!
//! [`ApiClient`] sends every call through an ordered
//! [`HttpMiddlewareChain`](http_middleware::HttpMiddlewareChain) and an
//! [`HttpTransport`](transport::HttpTransport). The standard chain built by
//! [`CoreBuilder`](crate::CoreBuilder) is:
//!
//! | priority | middleware | request | response |
//! |---|---|---|---|
//! | 5 | [`SessionInvalidationMiddleware`](auth_middleware::SessionInvalidationMiddleware) | | teardown on 401 |
//! | 10 | [`BearerAuthMiddleware`](auth_middleware::BearerAuthMiddleware) | attach token | |
//! | 100 | [`HttpLoggingMiddleware`](http_logging_middleware::HttpLoggingMiddleware) | log | log |

pub mod api;
pub mod auth_middleware;
pub mod config;
pub mod http_logging_middleware;
pub mod http_middleware;
pub mod transport;

pub use api::ApiClient;
pub use auth_middleware::{BearerAuthMiddleware, BearerToken, SessionInvalidationMiddleware};
pub use config::ClientConfig;
pub use http_logging_middleware::HttpLoggingMiddleware;
pub use http_middleware::{
    HttpMiddleware, HttpMiddlewareChain, HttpMiddlewareContext, HttpRequest, HttpResponse,
};
#[cfg(feature = "http-client")]
pub use transport::ReqwestTransport;
pub use transport::HttpTransport;
