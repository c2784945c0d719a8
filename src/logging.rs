//! `tracing` subscriber setup for binaries embedding the client.
//!
//! The filter comes from `RUST_LOG` and defaults to `info`, e.g.
//! `RUST_LOG=taskdeck=debug` to see every HTTP call.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{Error, Result};

fn filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

/// Install the global subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already set; use [`try_init_logging`]
/// where that can happen.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the global subscriber unless one is already set.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if a global subscriber already exists.
pub fn try_init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Configuration(format!("logging already initialized: {e}")))
}
