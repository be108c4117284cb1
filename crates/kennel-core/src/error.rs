//! Unified error types for kennel

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Unified error type for all kennel operations
#[derive(Error, Debug)]
pub enum KennelError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    // Backend verdicts
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Client-side verdicts
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl KennelError {
    /// True for failures where the backend never produced a verdict.
    ///
    /// These are the failures fetch boundaries degrade on; backend verdicts
    /// and validation failures are always surfaced to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Unavailable(_) | Self::Decode(_)
        )
    }

    /// Message suitable for showing next to a form or grid
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            Self::Validation(errors) => errors.to_string(),
            Self::Http(_) | Self::Unavailable(_) | Self::Decode(_) => {
                "The booking service could not be reached. Showing the last known data.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ValidationErrors> for KennelError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Result type alias using KennelError
pub type Result<T> = std::result::Result<T, KennelError>;
