//! Common error types for archgate.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while building archgate's primitive values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The container image string could not be normalized.
    #[error("invalid image reference: {0}")]
    InvalidImageReference(String),
}
