//! Error types for the hadith reader core
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Error type for the favorites/settings stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to persist '{key}': {message}")]
    PersistenceWrite { key: String, message: String },

    #[error("Failed to read '{key}': {message}")]
    PersistenceRead { key: String, message: String },

    #[error("Malformed data in '{key}': {message}")]
    Malformed { key: String, message: String },

    #[error("Invalid preference value: {0}")]
    InvalidPreferenceValue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the hadith reader core
pub type Result<T> = std::result::Result<T, StoreError>;
