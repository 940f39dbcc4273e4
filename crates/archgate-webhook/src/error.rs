//! Error types for the webhook.

use thiserror::Error;

/// Errors that fail an admission request.
///
/// These never escape as HTTP errors; they become an `allowed: false`
/// admission response carrying [`AdmissionError::http_status_code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The review or the pod it carries could not be decoded.
    #[error("failed to decode admission request: {0}")]
    Decode(String),

    /// The mutated pod could not be encoded into a patch.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdmissionError {
    /// The status code reported in the admission response.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Decode(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}

/// Errors from the post-admission confirmation task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    /// The pod is not visible through the API yet.
    #[error("pod {namespace}/{name} not found")]
    NotFound {
        /// Pod namespace.
        namespace: String,
        /// Pod name.
        name: String,
    },

    /// Any other API failure. Aborts retrying.
    #[error("kubernetes API error: {0}")]
    Api(String),

    /// The pod never became visible within the retry budget.
    #[error("pod still not found after {attempts} attempts")]
    RetriesExhausted {
        /// Number of lookups performed.
        attempts: u32,
    },

    /// The task ran past its deadline.
    #[error("confirmation timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

impl ConfirmationError {
    /// Whether the lookup should be retried.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from submitting work to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every worker is busy.
    #[error("worker pool saturated ({capacity} workers busy)")]
    Saturated {
        /// Pool capacity.
        capacity: usize,
    },
}
