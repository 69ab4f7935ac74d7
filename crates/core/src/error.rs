//! Core Error Types
//!
//! Failures raised by the core crate itself, which today means reading a
//! proxy URL. The application crate folds these into its own `AppError`.

use thiserror::Error;

/// Core error type for the Sentilens workspace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The URL could not be split into its parts
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Scheme other than http, https or socks5
    #[error("Unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    /// Well-formed but unusable value
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
