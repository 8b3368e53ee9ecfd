use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CommentFerryError {
    // Network errors
    #[error("Network timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    // Parse errors
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    ValidationError(String),

    // Signing errors
    #[error("Signature generation failed ({scheme}): {reason}")]
    SignatureFailed { scheme: String, reason: String },

    // Session errors
    #[error("Session bootstrap gave up after {attempts} attempts")]
    BootstrapExhausted { attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {0}")]
    IoError(String),
}

impl CommentFerryError {
    pub fn signature(scheme: impl ToString, reason: impl ToString) -> Self {
        CommentFerryError::SignatureFailed {
            scheme: scheme.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<wreq::Error> for CommentFerryError {
    fn from(err: wreq::Error) -> Self {
        if err.is_timeout() {
            CommentFerryError::Timeout(err.to_string())
        } else if err.is_connect() {
            CommentFerryError::NetworkError(format!("Connection failed: {}", err))
        } else {
            CommentFerryError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CommentFerryError {
    fn from(err: serde_json::Error) -> Self {
        CommentFerryError::InvalidJson(err.to_string())
    }
}

impl From<url::ParseError> for CommentFerryError {
    fn from(err: url::ParseError) -> Self {
        CommentFerryError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for CommentFerryError {
    fn from(err: std::io::Error) -> Self {
        CommentFerryError::IoError(err.to_string())
    }
}

/// Type alias for Result with CommentFerryError
pub type Result<T> = std::result::Result<T, CommentFerryError>;
