//! Payment Error Types

use thiserror::Error;

use labpay_catalog::CatalogError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors across checkout orchestration and settlement forwarding
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Caller-supplied input malformed or missing
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity absent upstream
    #[error("not found: {0}")]
    NotFound(String),

    /// Valid request but the listing has no seats left
    #[error("lab {0} is sold out")]
    SoldOut(String),

    /// Processor refused the request
    #[error("processor rejected the request ({status}): {message}")]
    Processor { status: u16, message: String },

    /// Transient processor failure
    #[error("processor unavailable: {0}")]
    ProcessorUnavailable(String),

    /// Missing or malformed deployment configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Webhook signature verification failed
    #[error("webhook signature invalid: {0}")]
    Signature(String),

    /// Delivery to the automation endpoint failed
    #[error("automation forward failed: {0}")]
    Forward(String),

    /// Content-store failure
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ProcessorUnavailable(_) | PaymentError::Forward(_) => true,
            PaymentError::Catalog(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-facing message. Upstream and configuration details stay
    /// server-side; buyer-caused failures carry their real reason.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Validation(m) => m.clone(),
            PaymentError::NotFound(what) => format!("{what} not found"),
            PaymentError::SoldOut(_) => "This lab is sold out.".to_string(),
            PaymentError::Signature(m) => format!("signature verification failed: {m}"),
            PaymentError::Forward(m) => m.clone(),
            PaymentError::Processor { .. }
            | PaymentError::ProcessorUnavailable(_)
            | PaymentError::Catalog(_) => "Payment processing failed. Please try again.".to_string(),
            PaymentError::Configuration(_) => "Service configuration error.".to_string(),
        }
    }
}
