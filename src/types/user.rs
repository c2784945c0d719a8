//! Account and authentication wire types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user's profile.
///
/// Profiles are replaced wholesale on login, signup and refresh; the client
/// never edits individual fields.
///
/// # Examples
///
/// ```
/// use taskdeck::types::UserProfile;
///
/// let user: UserProfile = serde_json::from_str(
///     r#"{"id":"u1","name":"A","email":"a@b.com","createdAt":"2024-01-01"}"#,
/// ).unwrap();
/// assert_eq!(user.created_at, "2024-01-01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Account creation timestamp as sent by the server.
    #[serde(alias = "createdAt")]
    pub created_at: String,
}

impl UserProfile {
    /// Account creation time, if the server timestamp is parseable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        super::parse_timestamp(&self.created_at)
    }
}

/// Body of a successful `login` or `signup` call.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token to present on authorized calls.
    pub access_token: String,
    /// Token scheme; the server sends `"bearer"`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Profile of the authenticated account.
    pub user: UserProfile,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .finish()
    }
}

/// `POST /api/auth/login` body.
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Account email.
    pub email: &'a str,
    /// Plain-text password, sent over the wire only.
    pub password: &'a str,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `POST /api/auth/signup` body.
#[derive(Clone, Serialize)]
pub struct SignupRequest<'a> {
    /// Display name.
    pub name: &'a str,
    /// Account email.
    pub email: &'a str,
    /// Plain-text password, sent over the wire only.
    pub password: &'a str,
}

impl fmt::Debug for SignupRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
