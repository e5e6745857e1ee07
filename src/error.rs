//! Error types shared by every solver stage.
//!
//! Only parameter problems and hash-capability failures are errors. Running out
//! of attempts is a normal outcome and lives in [`crate::solver::Outcome`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Failure reported by an [`crate::hash::EndpointHasher`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{hasher}: {message}")]
pub struct HashError {
    /// Name of the hasher that failed.
    pub hasher: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl HashError {
    /// Builds a hash error for the named hasher.
    pub fn new(hasher: &'static str, message: impl Into<String>) -> Self {
        Self {
            hasher,
            message: message.into(),
        }
    }
}

/// Fatal solver errors. Neither kind is retried: the same inputs would fail the
/// same way on the next attempt.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SolverError {
    /// A parameter (`n`, `k`, budgets, ...) is outside its supported range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The keyed-hash capability failed while deriving an endpoint.
    #[error("hash failure at attempt {attempt}, edge {edge}: {source}")]
    HashFailure {
        /// Attempt index being processed.
        attempt: u64,
        /// Edge index whose endpoint could not be derived.
        edge: u64,
        /// Underlying capability error.
        #[source]
        source: HashError,
    },
}

impl SolverError {
    /// Shorthand for [`SolverError::InvalidParameter`].
    pub fn invalid(message: impl Into<String>) -> Self {
        SolverError::InvalidParameter(message.into())
    }

    /// Returns `true` for parameter validation failures.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, SolverError::InvalidParameter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_failure_message_names_edge_and_hasher() {
        let err = SolverError::HashFailure {
            attempt: 3,
            edge: 17,
            source: HashError::new("broken", "backend offline"),
        };
        let text = err.to_string();
        assert!(text.contains("attempt 3"));
        assert!(text.contains("edge 17"));
        assert!(text.contains("broken: backend offline"));
        assert!(!err.is_invalid_parameter());
    }

    #[test]
    fn invalid_parameter_is_flagged() {
        let err = SolverError::invalid("k must be >= 1");
        assert!(err.is_invalid_parameter());
        assert_eq!(err.to_string(), "invalid parameter: k must be >= 1");
    }
}
