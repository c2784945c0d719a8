//! Authenticated session management.
//!
//! [`SessionContext`] is the session object; [`SessionManager`] performs the
//! server calls that move it between states.

pub mod context;
pub mod manager;
pub mod validation;

pub use context::{Session, SessionContext, SessionState};
pub use manager::{AuthOutcome, SessionManager};
pub use validation::{validate_login, validate_signup, SignupForm};
