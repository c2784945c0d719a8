//! Error types for Taskdeck client operations.
//!
//! [`Error`] separates failures by kind so callers can decide how to present
//! them: transport problems, server rejections, caller-side precondition
//! failures, missing records, and local persistence failures.

use serde_json::Value;
use thiserror::Error;

use crate::store::StorageError;

/// Result type alias for Taskdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the HTTP pipeline, session manager and task repository.
///
/// # Examples
///
/// ```
/// use taskdeck::Error;
///
/// let err = Error::Http {
///     status: 401,
///     body: r#"{"detail":"Token has expired"}"#.to_string(),
/// };
/// assert!(err.is_unauthorized());
/// assert_eq!(err.detail().as_deref(), Some("Token has expired"));
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure: no response was received.
    #[error("network error: {message}")]
    Network {
        /// Human-readable description of the failure.
        message: String,
        /// Whether the fixed request timeout elapsed.
        timed_out: bool,
    },

    /// The server responded with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A caller-side precondition was violated before dispatch.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced record does not exist on the server.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of record, e.g. `"task"`.
        resource: &'static str,
        /// Identifier that was requested.
        id: String,
    },

    /// Local credential persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A 2xx response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A middleware rejected the request or response.
    #[error("middleware error: {0}")]
    Middleware(String),
}

impl Error {
    /// Builds a [`Error::Network`] that did not time out.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Builds a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the HTTP status for [`Error::Http`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` when the server rejected the presented credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns `true` for transport failures caused by the request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { timed_out: true, .. })
    }

    /// Extracts the server's rejection detail from an [`Error::Http`] body.
    ///
    /// The server reports errors as `{"detail": ...}`. A string detail is
    /// returned verbatim; a list of validation items has each item's `msg`
    /// joined with `"; "`. Returns `None` for any other shape.
    pub fn detail(&self) -> Option<String> {
        let Self::Http { body, .. } = self else {
            return None;
        };
        let value: Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            Value::String(detail) if !detail.is_empty() => Some(detail.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            },
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(format!("invalid URL: {err}"))
    }
}
