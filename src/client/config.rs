//! Client configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "TASKDECK_BASE_URL";

/// Environment variable overriding [`ClientConfig::timeout_ms`].
pub const ENV_TIMEOUT_MS: &str = "TASKDECK_TIMEOUT_MS";

/// Settings for talking to the Taskdeck server.
///
/// # Example Configuration File
///
/// ```toml
/// base_url = "https://tasks.example.com"
/// timeout_ms = 5000
///
/// [headers]
/// "x-client" = "cli"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server origin; API paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fixed timeout applied to every call, in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// `User-Agent` sent with every call.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every call.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_user_agent() -> String {
    format!("taskdeck/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the TOML is malformed or fails
    /// [`validate`](Self::validate).
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `TASKDECK_BASE_URL` and `TASKDECK_TIMEOUT_MS`.
    ///
    /// An unparseable or zero timeout is ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().merge_vars(std::env::vars())
    }

    /// Applies the `TASKDECK_*` overrides found in `vars`.
    pub fn merge_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            match key.as_ref() {
                ENV_BASE_URL => self.base_url = value.into(),
                ENV_TIMEOUT_MS => {
                    let value = value.into();
                    match value.parse::<u64>() {
                        Ok(ms) if ms > 0 => self.timeout_ms = ms,
                        _ => tracing::warn!("ignoring invalid {ENV_TIMEOUT_MS}={value}"),
                    }
                },
                _ => {},
            }
        }
        self
    }

    /// Set the server origin.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Add a header sent with every call.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The parsed server origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] unless the URL is absolute http(s)
    /// and can carry a path.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Checks the base URL and that the timeout is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.timeout_ms == 0 {
            return Err(Error::Configuration("timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Serialize the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))
    }
}
