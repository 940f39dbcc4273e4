//! Error types for the placement crate.

use archgate_core::CoreError;
use archgate_registry::ResolveError;
use thiserror::Error;

/// Errors that can occur while computing or applying a pod's placement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// A container image could not be resolved.
    #[error("Image resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// A container image string is malformed.
    #[error("Invalid container image: {0}")]
    InvalidImage(#[from] CoreError),

    /// A container has no image.
    #[error("Container {0} has no image")]
    MissingImage(String),
}

/// A specialized Result type for placement operations.
pub type Result<T> = std::result::Result<T, PlacementError>;
