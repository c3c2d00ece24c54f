//! FX engine error types.

use ratebook_common::RatebookError;
use thiserror::Error;

/// Errors that can occur in the FX engine.
///
/// Unknown currencies and missing paths are not errors: they produce an
/// unreachable [`Conversion`](crate::Conversion).
#[derive(Debug, Error)]
pub enum FxError {
    /// The rate store failed while reading the snapshot.
    #[error(transparent)]
    Store(#[from] RatebookError),

    /// Composing factors along a path exceeded the decimal range.
    #[error("Conversion factor overflow along {path}")]
    FactorOverflow { path: String },
}

impl FxError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            FxError::Store(e) => e.is_retryable(),
            FxError::FactorOverflow { .. } => false,
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
