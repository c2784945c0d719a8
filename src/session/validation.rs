//! Pre-flight checks for credential forms.
//!
//! [`SessionManager`](super::SessionManager) does not call these itself;
//! front ends run them before submitting so obviously incomplete forms never
//! reach the server.

use crate::error::{Error, Result};

/// Shortest password accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

const MISSING_FIELDS: &str = "Please fill in all fields";
const PASSWORD_MISMATCH: &str = "Passwords do not match";

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Checks a login form.
///
/// # Errors
///
/// Returns [`Error::Validation`] if either field is blank.
pub fn validate_login(email: &str, password: &str) -> Result<()> {
    if blank(email) || blank(password) {
        return Err(Error::validation(MISSING_FIELDS));
    }
    Ok(())
}

/// A signup form as entered.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password typed a second time.
    pub confirm_password: String,
}

impl std::fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Checks a signup form.
///
/// # Errors
///
/// Returns [`Error::Validation`] with the first failing rule: a blank
/// field, mismatched passwords, or a password shorter than
/// [`MIN_PASSWORD_LEN`] characters.
///
/// # Examples
///
/// ```
/// use taskdeck::session::validation::{validate_signup, SignupForm};
///
/// let form = SignupForm {
///     name: "Ada".into(),
///     email: "ada@example.com".into(),
///     password: "abc".into(),
///     confirm_password: "abc".into(),
/// };
/// let err = validate_signup(&form).unwrap_err();
/// assert_eq!(err.to_string(), "validation error: Password must be at least 6 characters");
/// ```
pub fn validate_signup(form: &SignupForm) -> Result<()> {
    if [&form.name, &form.email, &form.password, &form.confirm_password]
        .into_iter()
        .any(|field| blank(field))
    {
        return Err(Error::validation(MISSING_FIELDS));
    }
    if form.password != form.confirm_password {
        return Err(Error::validation(PASSWORD_MISMATCH));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
