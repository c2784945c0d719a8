//! HTTP logging middleware with sensitive header redaction.
//!
//! Redaction is on by default:
//! - `authorization`: logged as `Bearer [REDACTED]` (scheme only)
//! - `cookie`, `set-cookie`, `x-api-key`, `proxy-authorization`,
//!   `x-auth-token`: logged as `[REDACTED]`
//!
//! Bodies are not logged unless [`HttpLoggingMiddleware::with_max_body_bytes`]
//! is set. Login and signup bodies carry passwords, so leave it unset outside
//! of local debugging.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use taskdeck::client::http_logging_middleware::HttpLoggingMiddleware;
//! use taskdeck::client::http_middleware::HttpMiddlewareChain;
//!
//! let mut chain = HttpMiddlewareChain::new();
//! chain.add(Arc::new(HttpLoggingMiddleware::new().with_level(tracing::Level::DEBUG)));
//! ```

use std::collections::HashSet;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, AUTHORIZATION};

use crate::client::http_middleware::{
    HttpMiddleware, HttpMiddlewareContext, HttpRequest, HttpResponse,
};
use crate::error::{Error, Result};

const REDACTED: &str = "[REDACTED]";

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            tracing::Level::TRACE => tracing::trace!($($arg)+),
            tracing::Level::DEBUG => tracing::debug!($($arg)+),
            tracing::Level::INFO => tracing::info!($($arg)+),
            tracing::Level::WARN => tracing::warn!($($arg)+),
            tracing::Level::ERROR => tracing::error!($($arg)+),
        }
    };
}

/// Logs every call made through the pipeline.
///
/// At `INFO` and above only the request line and status are logged; at
/// `DEBUG` and `TRACE` the redacted headers are included.
#[derive(Debug, Clone)]
pub struct HttpLoggingMiddleware {
    level: tracing::Level,
    redact_headers: HashSet<HeaderName>,
    show_auth_scheme: bool,
    max_header_value_len: Option<usize>,
    max_body_bytes: Option<usize>,
}

impl Default for HttpLoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpLoggingMiddleware {
    /// Create a logging middleware at `INFO` with the default redaction list
    /// and body logging disabled.
    pub fn new() -> Self {
        let redact_headers = [
            "authorization",
            "cookie",
            "set-cookie",
            "x-api-key",
            "proxy-authorization",
            "x-auth-token",
        ]
        .into_iter()
        .map(HeaderName::from_static)
        .collect();

        Self {
            level: tracing::Level::INFO,
            redact_headers,
            show_auth_scheme: true,
            max_header_value_len: None,
            max_body_bytes: None,
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Add a header to the redaction list.
    pub fn redact_header(mut self, name: HeaderName) -> Self {
        self.redact_headers.insert(name);
        self
    }

    /// Remove a header from the redaction list.
    pub fn allow_header(mut self, name: &HeaderName) -> Self {
        self.redact_headers.remove(name);
        self
    }

    /// Whether a redacted `authorization` value keeps its scheme.
    pub fn with_show_auth_scheme(mut self, show: bool) -> Self {
        self.show_auth_scheme = show;
        self
    }

    /// Truncate logged header values longer than `max_len` bytes.
    pub fn with_max_header_value_len(mut self, max_len: usize) -> Self {
        self.max_header_value_len = Some(max_len);
        self
    }

    /// Log up to `max_bytes` of each body.
    pub fn with_max_body_bytes(mut self, max_bytes: usize) -> Self {
        self.max_body_bytes = Some(max_bytes);
        self
    }

    /// Body logging limit, `None` when bodies are not logged.
    pub fn max_body_bytes(&self) -> Option<usize> {
        self.max_body_bytes
    }

    /// Value of header `name` as it would appear in the log.
    pub fn redact_header_value(&self, name: &HeaderName, value: &str) -> String {
        if !self.redact_headers.contains(name) {
            return self.truncate_value(value);
        }
        if name == AUTHORIZATION && self.show_auth_scheme {
            if let Some((scheme, _)) = value.split_once(' ') {
                return format!("{scheme} {REDACTED}");
            }
        }
        REDACTED.to_string()
    }

    fn truncate_value(&self, value: &str) -> String {
        match self.max_header_value_len {
            Some(max_len) if value.len() > max_len => {
                let mut end = max_len;
                while !value.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &value[..end])
            },
            _ => value.to_string(),
        }
    }

    /// Headers rendered for the log, redacted. Repeated headers are indexed.
    pub fn format_headers(&self, headers: &HeaderMap) -> String {
        let mut rendered = Vec::new();
        for name in headers.keys() {
            let values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|v| self.redact_header_value(name, v.to_str().unwrap_or("<invalid-utf8>")))
                .collect();
            if let [single] = values.as_slice() {
                rendered.push(format!("{}: {}", name, single));
            } else {
                for (idx, value) in values.iter().enumerate() {
                    rendered.push(format!("{}[{}]: {}", name, idx, value));
                }
            }
        }
        if rendered.is_empty() {
            "(no headers)".to_string()
        } else {
            rendered.join(", ")
        }
    }

    fn summarize_body(&self, body: &[u8]) -> String {
        let Some(max_bytes) = self.max_body_bytes else {
            return format!(" body={}B", body.len());
        };
        if body.is_empty() {
            return " body=0B".to_string();
        }
        let shown = max_bytes.min(body.len());
        let preview = String::from_utf8_lossy(&body[..shown]);
        if body.len() > shown {
            format!(" body={}B (showing {}B): {}...", body.len(), shown, preview)
        } else {
            format!(" body={}B: {}", body.len(), preview)
        }
    }

    fn verbose(&self) -> bool {
        self.level >= tracing::Level::DEBUG
    }

    fn log_request(&self, request: &HttpRequest, context: &HttpMiddlewareContext) {
        let body = self.summarize_body(&request.body);
        if self.verbose() {
            let headers = self.format_headers(&request.headers);
            log_at!(
                self.level,
                request_id = ?context.request_id,
                "HTTP {} {} | headers: [{}]{}",
                request.method,
                request.url,
                headers,
                body
            );
        } else {
            log_at!(
                self.level,
                request_id = ?context.request_id,
                "HTTP {} {}{}",
                request.method,
                request.url,
                if self.max_body_bytes.is_some() { body.as_str() } else { "" }
            );
        }
    }

    fn log_response(&self, response: &HttpResponse, context: &HttpMiddlewareContext) {
        let body = self.summarize_body(&response.body);
        let marker = if response.is_success() {
            "ok"
        } else if response.is_client_error() || response.is_server_error() {
            "failed"
        } else {
            "->"
        };
        if self.verbose() {
            let headers = self.format_headers(&response.headers);
            log_at!(
                self.level,
                request_id = ?context.request_id,
                "HTTP {} {} {} {} | headers: [{}]{}",
                context.method,
                context.url,
                response.status,
                marker,
                headers,
                body
            );
        } else {
            log_at!(
                self.level,
                request_id = ?context.request_id,
                "HTTP {} {} {} {}{}",
                context.method,
                context.url,
                response.status,
                marker,
                if self.max_body_bytes.is_some() { body.as_str() } else { "" }
            );
        }
    }
}

#[async_trait]
impl HttpMiddleware for HttpLoggingMiddleware {
    async fn on_request(
        &self,
        request: &mut HttpRequest,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        self.log_request(request, context);
        Ok(())
    }

    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &HttpMiddlewareContext,
    ) -> Result<()> {
        self.log_response(response, context);
        Ok(())
    }

    async fn on_error(&self, error: &Error, context: &HttpMiddlewareContext) -> Result<()> {
        // Non-2xx statuses were already logged by on_response.
        if !matches!(error, Error::Http { .. }) {
            tracing::warn!(
                request_id = ?context.request_id,
                "HTTP {} {} failed: {}",
                context.method,
                context.url,
                error
            );
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        // Requests are logged after credentials are attached, responses
        // before the session is invalidated.
        100
    }
}
