//! Catalog Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Content-store and resolver errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Lookup returned no item
    #[error("no match in collection {collection} for {key}")]
    NotFound { collection: String, key: String },

    /// Transient upstream failure, retries exhausted
    #[error("content store unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },

    /// Upstream refused the request, not retryable
    #[error("content store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Response body could not be decoded
    #[error("content store response decode error: {0}")]
    Decode(String),

    /// Client could not be constructed
    #[error("content store client configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Unavailable { .. })
    }
}
