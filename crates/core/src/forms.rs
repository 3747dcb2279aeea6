#![allow(missing_docs)]

//! Form payloads and their validation rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ValidationErrors;

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// A form payload that can check its own fields.
pub trait Validate {
    /// Check every field, reporting all failures at once.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Search box contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    pub search: String,
}

impl Validate for SearchForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.search.trim().is_empty() {
            errors.push("search", "Search is required");
        }
        errors.into_result()
    }
}

/// Sign-in with a token issued by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub token: String,
    pub name: String,
    pub email: String,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.token.trim().is_empty() {
            errors.push("token", "Token is required");
        }
        let email = self.email.trim();
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            errors.push("email", "Enter a valid email address");
        }
        errors.into_result()
    }
}

/// Request a password-reset email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl Validate for ForgotPasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let email = self.email.trim();
        if email.is_empty() {
            errors.push("email", "Email is required");
        } else if !EMAIL_RE.is_match(email) {
            errors.push("email", "Enter a valid email address");
        }
        errors.into_result()
    }
}

/// Choose a new password from the emailed reset link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

impl Validate for ResetPasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.password.is_empty() {
            errors.push("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        if self.confirm_password != self.password {
            errors.push("confirm_password", "Passwords must match");
        }
        errors.into_result()
    }
}
