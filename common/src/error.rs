//! Error types for Ratebook.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::currency::CurrencyCode;

/// Main error type for currency and rate store operations.
#[derive(Error, Debug)]
pub enum RatebookError {
    /// Currency code is empty, too long or not alphanumeric.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),

    /// Referenced currency does not exist.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(CurrencyCode),

    /// A rate must connect two different currencies.
    #[error("Rate from {0} to itself is not allowed")]
    SameCurrencyRate(CurrencyCode),

    /// A non-zero factor, or its reciprocal, rounds to zero at the store scale.
    #[error("Rate factor {factor} from {from} to {to} is not representable at scale {scale}")]
    UnrepresentableFactor {
        from: CurrencyCode,
        to: CurrencyCode,
        factor: Decimal,
        scale: u32,
    },

    /// Store or transaction failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RatebookError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RatebookError::Database(_))
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            RatebookError::InvalidCurrencyCode(_) => "INVALID_CURRENCY_CODE",
            RatebookError::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            RatebookError::SameCurrencyRate(_) => "SAME_CURRENCY_RATE",
            RatebookError::UnrepresentableFactor { .. } => "UNREPRESENTABLE_FACTOR",
            RatebookError::Database(_) => "DATABASE_ERROR",
            RatebookError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for Ratebook operations.
pub type Result<T> = std::result::Result<T, RatebookError>;
