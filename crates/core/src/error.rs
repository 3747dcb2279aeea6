//! Typed errors surfaced to the front-end.

use std::fmt;

use thiserror::Error;

/// Failures the UI can match on and turn into status messages.
#[derive(Debug, Error)]
pub enum PortalError {
    /// A debounce unit was created with a zero delay.
    #[error("debounce delay must be greater than zero")]
    ZeroDelay,
    /// A timer-backed component was created outside a Tokio runtime.
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    /// Form input did not pass validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// The API answered with a non-success status.
    #[error("request failed ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// First human-readable message extracted from the response body.
        message: String,
    },
    /// Transport-level failure talking to the API.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// A single failing form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name as used by the form.
    pub field: &'static str,
    /// Message shown next to the field.
    pub message: String,
}

/// Every failing field of one validation pass, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Convert into a `Result`, succeeding when no field failed.
    pub(crate) fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// All failing fields.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message for the given field, if it failed.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    /// Whether no field failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}
