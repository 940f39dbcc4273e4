//! Registry error types.

use thiserror::Error;

/// A result type using `ResolveError`.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that can occur while resolving an image's architectures.
///
/// `Clone` so that every caller waiting on the same in-flight lookup observes
/// the same error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The image or its manifest does not exist in the registry.
    #[error("image not found: {0}")]
    NotFound(String),

    /// The registry rejected the supplied credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The manifest or image config could not be interpreted.
    #[error("manifest parse failure: {0}")]
    ManifestParse(String),

    /// Network or protocol failure talking to the registry.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Registry settings forbid pulling the image.
    #[error("registry blocked: {0}")]
    Blocked(String),

    /// The image string is not a valid reference.
    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    /// A pull secret could not be decoded.
    #[error("invalid pull secret: {0}")]
    InvalidCredentials(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    /// Check if a later attempt might succeed without user intervention.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Internal(_))
    }
}

impl From<archgate_core::CoreError> for ResolveError {
    fn from(err: archgate_core::CoreError) -> Self {
        Self::InvalidReference(err.to_string())
    }
}

/// Errors that can occur while writing registry system configuration.
#[derive(Debug, Error)]
pub enum SystemConfigError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The registries file could not be encoded.
    #[error("TOML encoding error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// The policy file could not be encoded.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A registry location cannot name a certificate folder.
    #[error("invalid registry location: {0:?}")]
    InvalidRegistryLocation(String),

    /// The registry client rejected the TLS settings, e.g. a malformed CA.
    #[error("registry client for {registry}: {message}")]
    Client {
        /// Registry whose settings were rejected, or `default`.
        registry: String,
        /// Underlying error.
        message: String,
    },
}
