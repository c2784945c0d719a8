//! # taskdeck
//!
//! Session, credential and task-sync core for the Taskdeck task-tracking
//! client.
//!
//! The crate is four pieces:
//!
//! - [`store`]: durable key-value persistence for the bearer token and the
//!   last-known profile ([`CredentialStore`](store::CredentialStore)).
//! - [`client`]: the HTTP pipeline. Every call goes through an ordered
//!   middleware chain that attaches the stored token and tears the session
//!   down when the server answers `401`.
//! - [`session`]: the explicit [`SessionContext`](session::SessionContext)
//!   and the [`SessionManager`](session::SessionManager) that logs in, signs
//!   up, logs out and refreshes the profile.
//! - [`tasks`]: the [`TaskRepository`], a cache-free view of the server's
//!   tasks. Callers re-list after every mutation.
//!
//! [`CoreBuilder`] wires them together.
//!
//! ## Features
//!
//! - `http-client` (default): the reqwest-based
//!   [`ReqwestTransport`](client::ReqwestTransport).
//! - `logging` (default): [`logging::init_logging`] for binaries.
//!
//! ## Example
//!
//! ```no_run
//! use taskdeck::{ClientConfig, CoreBuilder, TaskFilter, TaskStatus, TaskUpdate};
//!
//! # async fn run() -> taskdeck::Result<()> {
//! let core = CoreBuilder::new(ClientConfig::from_env()).build()?;
//! core.session.init().await;
//!
//! let outcome = core.session.login("a@b.com", "secret1").await;
//! if let Some(message) = outcome.message() {
//!     eprintln!("login failed: {message}");
//!     return Ok(());
//! }
//!
//! let task = core.tasks.create("Buy milk", "").await?;
//! core.tasks
//!     .update(&task.id, &TaskUpdate::new().status(TaskStatus::Completed))
//!     .await?;
//!
//! let pending = core.tasks.list(TaskFilter::Pending).await?;
//! let stats = core.tasks.stats().await?;
//! println!("{} pending of {}", pending.len(), stats.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod client;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod session;
pub mod store;
pub mod tasks;
pub mod types;

pub use builder::{Core, CoreBuilder};
pub use client::{ApiClient, ClientConfig};
pub use error::{Error, Result};
pub use session::{AuthOutcome, Session, SessionContext, SessionManager, SessionState};
pub use store::{CredentialStore, StorageError};
pub use tasks::TaskRepository;
pub use types::{NewTask, StatsSnapshot, Task, TaskFilter, TaskStatus, TaskUpdate, UserProfile};
