//! Login and registration form checks, and classification of backend
//! failures into user-facing message keys.
//!
//! Duplicate-username / duplicate-email detection prefers a structured
//! `code` from the backend. Without one it falls back to matching the
//! backend's prose, which breaks whenever that wording changes.

use thiserror::Error;

use super::backend::{BackendError, Registration};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 100;

const USERNAME_TAKEN_CODE: &str = "username_exists";
const EMAIL_TAKEN_CODE: &str = "email_exists";
const USERNAME_TAKEN_MARKERS: [&str; 2] = ["用户名", "username already"];
const EMAIL_TAKEN_MARKERS: [&str; 2] = ["邮箱", "email already"];

/// What the registration page submits.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password must be at least {PASSWORD_MIN_LEN} characters")]
    PasswordTooShort,

    #[error("password must be at most {PASSWORD_MAX_LEN} characters")]
    PasswordTooLong,

    #[error("username must be {USERNAME_MIN_LEN} to {USERNAME_MAX_LEN} characters")]
    UsernameLength,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("username already exists")]
    UsernameExists,

    #[error("email already exists")]
    EmailExists,

    /// Backend said no for a reason we do not classify; its text is kept.
    #[error("{0}")]
    Rejected(String),

    #[error("registration failed: {0}")]
    Unavailable(String),
}

impl RegisterError {
    /// Translation key for this error. `None` means show the error text
    /// itself (backend detail passed through).
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Self::PasswordMismatch => Some("register.passwordMismatch"),
            Self::PasswordTooShort => Some("register.passwordTooShort"),
            Self::PasswordTooLong => Some("register.passwordTooLong"),
            Self::UsernameLength => Some("register.usernameLength"),
            Self::InvalidEmail => Some("register.invalidEmail"),
            Self::UsernameExists => Some("register.usernameExists"),
            Self::EmailExists => Some("register.emailExists"),
            Self::Rejected(_) => None,
            Self::Unavailable(_) => Some("register.registerFailed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    /// Wrong username/password; carries the backend's detail when present.
    #[error("invalid credentials")]
    InvalidCredentials(Option<String>),

    #[error("login failed: {0}")]
    Unavailable(String),

    #[error("could not store credential: {0}")]
    Store(String),
}

impl LoginError {
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCredentials(Some(_)) => None,
            Self::InvalidCredentials(None) => Some("login.invalidCredentials"),
            Self::Unavailable(_) | Self::Store(_) => Some("login.loginFailed"),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidCredentials(detail) => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<BackendError> for LoginError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Rejected { detail, .. } => {
                Self::InvalidCredentials((!detail.is_empty()).then_some(detail))
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Check the form locally. Order matches what the page reports first:
/// confirmation mismatch, then password length, then username, then email.
pub fn validate_registration(form: &RegistrationForm) -> Result<Registration, RegisterError> {
    if form.password != form.confirm_password {
        return Err(RegisterError::PasswordMismatch);
    }
    let password_len = form.password.chars().count();
    if password_len < PASSWORD_MIN_LEN {
        return Err(RegisterError::PasswordTooShort);
    }
    if password_len > PASSWORD_MAX_LEN {
        return Err(RegisterError::PasswordTooLong);
    }

    let username = form.username.trim();
    let username_len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
        return Err(RegisterError::UsernameLength);
    }

    let email = form.email.trim();
    if !is_plausible_email(email) {
        return Err(RegisterError::InvalidEmail);
    }

    Ok(Registration {
        username: username.to_string(),
        email: email.to_string(),
        password: form.password.clone(),
    })
}

/// Map a backend registration failure onto a [`RegisterError`].
pub fn classify_register_failure(e: BackendError) -> RegisterError {
    match e {
        BackendError::Rejected { detail, code, .. } => {
            match code.as_deref() {
                Some(USERNAME_TAKEN_CODE) => return RegisterError::UsernameExists,
                Some(EMAIL_TAKEN_CODE) => return RegisterError::EmailExists,
                _ => {}
            }
            let lowered = detail.to_lowercase();
            if USERNAME_TAKEN_MARKERS.iter().any(|m| lowered.contains(m)) {
                RegisterError::UsernameExists
            } else if EMAIL_TAKEN_MARKERS.iter().any(|m| lowered.contains(m)) {
                RegisterError::EmailExists
            } else if detail.is_empty() {
                RegisterError::Unavailable("backend rejected registration".into())
            } else {
                RegisterError::Rejected(detail)
            }
        }
        other => RegisterError::Unavailable(other.to_string()),
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}
