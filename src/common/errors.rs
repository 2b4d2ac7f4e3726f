//! Error types for the application

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for tracker operations
///
/// Transient upstream failures never surface through this type to callers of
/// the fetch path; they are logged and collapsed to an empty snapshot.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Filesystem errors while reading or writing price records
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Base URL or endpoint could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Watch list lookup failed
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// No price record exists for the product
    #[error("No price record for product {product_id} at {}", path.display())]
    RecordNotFound { product_id: String, path: PathBuf },

    /// Alert delivery failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<url::ParseError> for TrackerError {
    fn from(err: url::ParseError) -> Self {
        TrackerError::InvalidUrl(err.to_string())
    }
}
