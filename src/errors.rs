//! Error types for dioxus-infinite-provider
//!
//! Fetch failures are the caller's own error type and are surfaced through the
//! query projection. The types here cover the engine's own failure modes.

use thiserror::Error;

/// Crate-level error for configuration and bootstrap problems
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaginationError {
    /// Invalid query or store configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The global page store was used before `init()` was called
    #[error("Global page store not initialized. Call dioxus_infinite_provider::init() first.")]
    NotInitialized,

    /// A response could not be normalized into a page
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),
}

/// Failure raised by an extractor while normalizing a response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("field '{field}' is missing from the response")]
    MissingField { field: String },

    #[error("field '{field}' has the wrong type: expected {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("failed to deserialize items: {0}")]
    Deserialize(String),

    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Shorthand for a custom extraction failure
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialize(err.to_string())
    }
}

/// Result alias for engine-level operations
pub type PaginationResult<T> = Result<T, PaginationError>;

/// Result alias for extractor functions
pub type ExtractResult<T> = Result<T, ExtractError>;
